//! Application error types.

use std::fmt;

use thiserror::Error;

use crate::cache::PersistenceError;
use crate::executor::DispatchError;
use crate::provider::FetchError;
use crate::render::{PaletteError, RenderError};

/// Errors that can occur during application lifecycle.
#[derive(Debug)]
pub enum AppError {
    /// Failed to build the HTTP client.
    HttpClient(FetchError),

    /// Failed to load the block palette.
    Palette(PaletteError),

    /// Failed to save the cache.
    Persistence(PersistenceError),

    /// Startup task failed.
    Startup(String),

    /// Configuration error.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            AppError::Palette(e) => write!(f, "Failed to load block palette: {}", e),
            AppError::Persistence(e) => write!(f, "Failed to save chunk cache: {}", e),
            AppError::Startup(msg) => write!(f, "Failed to start: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::HttpClient(e) => Some(e),
            AppError::Palette(e) => Some(e),
            AppError::Persistence(e) => Some(e),
            AppError::Startup(_) | AppError::Config(_) => None,
        }
    }
}

impl From<PaletteError> for AppError {
    fn from(e: PaletteError) -> Self {
        AppError::Palette(e)
    }
}

impl From<PersistenceError> for AppError {
    fn from(e: PersistenceError) -> Self {
        AppError::Persistence(e)
    }
}

/// Errors from the region surface (`load_region`, `render_region`).
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
