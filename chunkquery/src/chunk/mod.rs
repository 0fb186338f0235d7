//! Chunk payloads as served by the game server.
//!
//! The server answers a chunk request with a JSON object holding two 16×16
//! grids indexed `[x][z]`: the surface height of every column and the block
//! identifier found there. Any further fields are ignored.
//!
//! Records are stored as-is. The grids are not validated beyond successful
//! deserialization, so accessors return `None` for cells a malformed payload
//! does not provide instead of panicking.

use serde::{Deserialize, Serialize};

use crate::coord::CHUNK_SIZE;

/// Height and surface block grids of one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Surface height per column, indexed `[x][z]`
    pub height: Vec<Vec<i32>>,
    /// Surface block identifier per column, indexed `[x][z]`
    pub blocks: Vec<Vec<String>>,
}

impl ChunkRecord {
    pub fn new(height: Vec<Vec<i32>>, blocks: Vec<Vec<String>>) -> Self {
        Self { height, blocks }
    }

    /// Builds a full 16×16 record where every column has the same height and block.
    pub fn filled(height: i32, block: &str) -> Self {
        Self {
            height: vec![vec![height; CHUNK_SIZE]; CHUNK_SIZE],
            blocks: vec![vec![block.to_string(); CHUNK_SIZE]; CHUNK_SIZE],
        }
    }

    /// Builds a 16×16 record from a per-cell generator.
    pub fn from_fn(mut cell: impl FnMut(usize, usize) -> (i32, String)) -> Self {
        let mut height = Vec::with_capacity(CHUNK_SIZE);
        let mut blocks = Vec::with_capacity(CHUNK_SIZE);
        for x in 0..CHUNK_SIZE {
            let mut height_row = Vec::with_capacity(CHUNK_SIZE);
            let mut block_row = Vec::with_capacity(CHUNK_SIZE);
            for z in 0..CHUNK_SIZE {
                let (h, b) = cell(x, z);
                height_row.push(h);
                block_row.push(b);
            }
            height.push(height_row);
            blocks.push(block_row);
        }
        Self { height, blocks }
    }

    /// Surface height at cell `(x, z)`.
    #[inline]
    pub fn height_at(&self, x: usize, z: usize) -> Option<i32> {
        self.height.get(x).and_then(|row| row.get(z)).copied()
    }

    /// Surface block identifier at cell `(x, z)`.
    #[inline]
    pub fn block_at(&self, x: usize, z: usize) -> Option<&str> {
        self.blocks
            .get(x)
            .and_then(|row| row.get(z))
            .map(String::as_str)
    }

    /// Returns true if both grids are complete 16×16 grids.
    pub fn is_complete(&self) -> bool {
        self.height.len() == CHUNK_SIZE
            && self.blocks.len() == CHUNK_SIZE
            && self.height.iter().all(|row| row.len() == CHUNK_SIZE)
            && self.blocks.iter().all(|row| row.len() == CHUNK_SIZE)
    }
}
