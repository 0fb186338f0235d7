//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use chunkquery::app::{AppError, RegionError};
use chunkquery::cache::PersistenceError;
use chunkquery::config::ConfigFileError;
use chunkquery::images::ImageQueryError;
use chunkquery::provider::FetchError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to build the async runtime
    Runtime(std::io::Error),
    /// Failed to start the application
    Startup(AppError),
    /// Player lookup failed
    Player(FetchError),
    /// Region load or render failed
    Region(RegionError),
    /// Rendered image could not be retrieved
    Image(ImageQueryError),
    /// Failed to save the chunk cache
    Save(PersistenceError),
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Startup(AppError::HttpClient(_))
            | CliError::Player(FetchError::Connection(_)) => {
                eprintln!();
                eprintln!("Make sure the game server API is running and that");
                eprintln!("api_server in config.ini points at it.");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Run 'chunkquery init' to write a default config.ini.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Startup(e) => write!(f, "{}", e),
            CliError::Player(e) => write!(f, "Failed to locate player: {}", e),
            CliError::Region(e) => write!(f, "Region request failed: {}", e),
            CliError::Image(e) => write!(f, "Failed to retrieve image: {}", e),
            CliError::Save(e) => write!(f, "Failed to save chunk cache: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::Startup(e) => Some(e),
            CliError::Player(e) => Some(e),
            CliError::Region(e) => Some(e),
            CliError::Image(e) => Some(e),
            CliError::Save(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::LoggingInit(_) | CliError::Config(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::Startup(e)
    }
}

impl From<RegionError> for CliError {
    fn from(e: RegionError) -> Self {
        CliError::Region(e)
    }
}

impl From<ImageQueryError> for CliError {
    fn from(e: ImageQueryError) -> Self {
        CliError::Image(e)
    }
}

impl From<PersistenceError> for CliError {
    fn from(e: PersistenceError) -> Self {
        CliError::Save(e)
    }
}
