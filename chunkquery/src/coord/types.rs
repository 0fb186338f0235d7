//! Coordinate value types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CHUNK_SIZE, MAX_RADIUS};

/// Chunk grid position within a single world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// Chunk X coordinate
    pub cx: i32,
    /// Chunk Z coordinate
    pub cz: i32,
}

impl ChunkCoord {
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Returns the coordinate shifted by `(dx, dz)` chunks, or `None` if
    /// that leaves the `i32` grid.
    #[inline]
    pub fn checked_offset(&self, dx: i64, dz: i64) -> Option<Self> {
        let cx = i32::try_from(self.cx as i64 + dx).ok()?;
        let cz = i32::try_from(self.cz as i64 + dz).ok()?;
        Some(Self { cx, cz })
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from((cx, cz): (i32, i32)) -> Self {
        Self { cx, cz }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.cx, self.cz)
    }
}

/// Unique identity of a cached chunk.
///
/// Displays as `world,cx,cz`, which is also how chunks are named in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    /// World (dimension) the chunk belongs to
    pub world: String,
    /// Chunk X coordinate
    pub cx: i32,
    /// Chunk Z coordinate
    pub cz: i32,
}

impl ChunkKey {
    pub fn new(world: impl Into<String>, cx: i32, cz: i32) -> Self {
        Self {
            world: world.into(),
            cx,
            cz,
        }
    }

    /// Builds a key from a world name and a grid coordinate.
    pub fn at(world: &str, coord: ChunkCoord) -> Self {
        Self::new(world, coord.cx, coord.cz)
    }

    /// Returns the grid coordinate part of the key.
    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.cx, self.cz)
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.world, self.cx, self.cz)
    }
}

/// Why a region cannot be loaded or rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRegion {
    #[error("radius must be at least 1")]
    ZeroRadius,

    #[error("radius {0} exceeds the maximum of {max}", max = MAX_RADIUS)]
    RadiusTooLarge(u32),

    #[error("region of radius {radius} around {center} leaves the chunk grid")]
    OutOfRange { center: ChunkCoord, radius: u32 },
}

/// Square area of chunks around a center coordinate.
///
/// Covers `center + [-radius, radius)` on both axes, so a region of radius
/// `r` contains `(2r)²` chunks and renders to `2r·16` pixels per side.
///
/// [`Region::new`] does not check its arguments; the size accessors saturate
/// and the iterator skips coordinates outside the `i32` grid. Use
/// [`Region::try_new`] for anything that came from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub center: ChunkCoord,
    pub radius: u32,
}

impl Region {
    pub const fn new(center: ChunkCoord, radius: u32) -> Self {
        Self { center, radius }
    }

    /// Builds a region after checking it with [`validate`](Self::validate).
    pub fn try_new(center: ChunkCoord, radius: u32) -> Result<Self, InvalidRegion> {
        let region = Self::new(center, radius);
        region.validate()?;
        Ok(region)
    }

    /// Checks the radius is in `1..=MAX_RADIUS` and every chunk of the
    /// region lies on the `i32` grid.
    pub fn validate(&self) -> Result<(), InvalidRegion> {
        if self.radius == 0 {
            return Err(InvalidRegion::ZeroRadius);
        }
        if self.radius > MAX_RADIUS {
            return Err(InvalidRegion::RadiusTooLarge(self.radius));
        }
        let r = self.radius as i64;
        let in_range = |c: i32| {
            let c = c as i64;
            c - r >= i32::MIN as i64 && c + r - 1 <= i32::MAX as i64
        };
        if !in_range(self.center.cx) || !in_range(self.center.cz) {
            return Err(InvalidRegion::OutOfRange {
                center: self.center,
                radius: self.radius,
            });
        }
        Ok(())
    }

    /// Number of chunks along one edge of the region.
    #[inline]
    pub fn chunks_per_side(&self) -> u32 {
        self.radius.saturating_mul(2)
    }

    /// Total number of chunks covered by the region.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        let side = self.chunks_per_side() as usize;
        side.saturating_mul(side)
    }

    /// Edge length of the rendered canvas in pixels.
    #[inline]
    pub fn pixel_size(&self) -> u32 {
        self.chunks_per_side().saturating_mul(CHUNK_SIZE as u32)
    }

    /// Returns true if the coordinate lies inside the region.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        let r = self.radius as i64;
        let dx = coord.cx as i64 - self.center.cx as i64;
        let dz = coord.cz as i64 - self.center.cz as i64;
        (-r..r).contains(&dx) && (-r..r).contains(&dz)
    }

    /// Iterates the region's chunks, X-major then Z.
    pub fn chunks(&self) -> RegionChunksIterator {
        RegionChunksIterator {
            region: *self,
            current: 0,
        }
    }

    /// Iterates the region's chunks as cache keys in `world`.
    pub fn keys<'a>(&self, world: &'a str) -> impl Iterator<Item = ChunkKey> + 'a {
        self.chunks().map(move |chunk| ChunkKey::at(world, chunk.coord))
    }
}

/// A chunk inside a region together with its position on the region grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionChunk {
    /// Absolute chunk coordinate
    pub coord: ChunkCoord,
    /// Column on the region grid, `0..2·radius` (west to east)
    pub column: u32,
    /// Row on the region grid, `0..2·radius` (north to south)
    pub row: u32,
}

impl RegionChunk {
    /// Pixel position of the chunk's first cell on the rendered canvas.
    #[inline]
    pub fn pixel_origin(&self) -> (u32, u32) {
        (
            self.column.saturating_mul(CHUNK_SIZE as u32),
            self.row.saturating_mul(CHUNK_SIZE as u32),
        )
    }
}

/// Iterator over all chunks in a region.
#[derive(Debug, Clone)]
pub struct RegionChunksIterator {
    region: Region,
    current: usize,
}

impl Iterator for RegionChunksIterator {
    type Item = RegionChunk;

    fn next(&mut self) -> Option<Self::Item> {
        let side = self.region.chunks_per_side() as usize;
        let r = self.region.radius as i64;

        while self.current < self.region.chunk_count() {
            let column = (self.current / side) as u32;
            let row = (self.current % side) as u32;
            self.current += 1;

            let coord = self
                .region
                .center
                .checked_offset(column as i64 - r, row as i64 - r);
            if let Some(coord) = coord {
                return Some(RegionChunk { coord, column, row });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.region.chunk_count().saturating_sub(self.current);
        (0, Some(remaining))
    }
}
