//! Chunk cache and its on-disk snapshot.
//!
//! [`ChunkCache`] is the single in-memory store of downloaded chunks. It is
//! created once at startup, shared by `Arc` between the download workers
//! (writers) and the render worker (bulk reader), and written to disk as a
//! whole by the [`PersistenceManager`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chunkquery::cache::{ChunkCache, PersistenceManager};
//!
//! let persistence = PersistenceManager::new("chunk_cache.bin");
//! let cache = Arc::new(match persistence.load() {
//!     Some(snapshot) => ChunkCache::from_snapshot(snapshot),
//!     None => ChunkCache::new(),
//! });
//!
//! // ... workers fill the cache ...
//!
//! persistence.save(&cache).await?;
//! ```

mod memory;
mod snapshot;

pub use memory::{CacheStats, ChunkCache, ChunkExtent, ChunkGrid};
pub use snapshot::{
    default_cache_path, CacheSnapshot, PersistenceError, PersistenceManager, SaveStats,
    DEFAULT_CACHE_FILE_NAME,
};
