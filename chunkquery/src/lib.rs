//! ChunkQuery - game-world chunk cache and map renderer
//!
//! This library downloads terrain chunks from a game server, keeps them in a
//! concurrent in-memory cache that survives restarts, and renders square
//! regions of the cache into a grayscale heightmap PNG and a colored texture
//! PNG that clients can fetch by requester name.
//!
//! The usual entry point is [`app::ChunkQueryApp`], which wires the cache,
//! the download worker pool and the render worker together.

pub mod app;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod coord;
pub mod executor;
pub mod images;
pub mod logging;
pub mod provider;
pub mod render;
pub mod telemetry;

pub use app::{AppConfig, AppError, AppStatus, ChunkQueryApp, LoadSummary, RegionError};
pub use chunk::ChunkRecord;
pub use coord::{ChunkCoord, ChunkKey, InvalidRegion, Region, MAX_RADIUS};
pub use images::{ImageKind, ImageQueryError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
