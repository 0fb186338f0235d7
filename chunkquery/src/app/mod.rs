//! Application bootstrap and lifecycle management.
//!
//! [`ChunkQueryApp`] creates the chunk cache once, wires the download
//! dispatcher, render pipeline, image store and persistence around it, and
//! tears them down in order.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ChunkQueryApp                            │
//! │                                                                 │
//! │  load_region ──► DownloadDispatcher ──► ChunkFetcher            │
//! │                        │ (N workers)                            │
//! │                        ▼                                        │
//! │                   ChunkCache ◄──── PersistenceManager (load)    │
//! │                        │                                        │
//! │  render_region ─► RenderPipeline ──► ImageStore ◄── get_image   │
//! │                        │ (1 worker)                             │
//! │                        └──────────► PersistenceManager (save)   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use chunkquery::app::{AppConfig, ChunkQueryApp};
//! use chunkquery::coord::ChunkCoord;
//! use chunkquery::images::ImageKind;
//! use chunkquery::render::BlockPalette;
//!
//! let app = ChunkQueryApp::start_http(AppConfig::default(), BlockPalette::overworld()).await?;
//!
//! app.load_region(ChunkCoord::new(0, 0), 12, "world", false)?;
//! app.render_region_and_wait(ChunkCoord::new(0, 0), 12, "world", "alice").await?;
//! let png = app.get_image("alice", ImageKind::Texture)?;
//!
//! app.shutdown().await?;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::{AppStatus, ChunkQueryApp, LoadSummary};
pub use config::AppConfig;
pub use error::{AppError, RegionError};
