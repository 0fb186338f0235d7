//! Chunk coordinate types.
//!
//! A world is partitioned into 16×16-cell chunks addressed by integer grid
//! coordinates `(cx, cz)`. Chunk grids of different worlds are independent,
//! so a cached chunk is identified by [`ChunkKey`] = (world, cx, cz).
//!
//! Regions are square areas of chunks around a center, `[-radius, radius)`
//! on both axes, which is the unit the download and render pipelines work on.

mod types;

pub use types::{ChunkCoord, ChunkKey, InvalidRegion, Region, RegionChunk, RegionChunksIterator};

/// Number of cells along each edge of a chunk.
pub const CHUNK_SIZE: usize = 16;

/// Largest region radius accepted from callers.
///
/// A region of this radius renders to 4096×4096 pixels.
pub const MAX_RADIUS: u32 = 128;

/// World used when a caller does not name one.
pub const DEFAULT_WORLD: &str = "world";
