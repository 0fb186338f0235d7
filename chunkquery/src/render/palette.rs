//! Block identifier to color mapping.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Color painted for blocks the palette does not know.
pub const FALLBACK_COLOR: [u8; 3] = [255, 0, 0];

#[derive(Debug, Error)]
pub enum PaletteError {
    #[error("failed to read palette {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid palette JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Lookup table from block identifier to RGB color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPalette {
    colors: HashMap<String, [u8; 3]>,
    fallback: [u8; 3],
}

impl Default for BlockPalette {
    fn default() -> Self {
        Self {
            colors: HashMap::new(),
            fallback: FALLBACK_COLOR,
        }
    }
}

impl FromIterator<(String, [u8; 3])> for BlockPalette {
    fn from_iter<T: IntoIterator<Item = (String, [u8; 3])>>(iter: T) -> Self {
        Self {
            colors: iter.into_iter().collect(),
            fallback: FALLBACK_COLOR,
        }
    }
}

impl BlockPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, block: impl Into<String>, color: [u8; 3]) -> Self {
        self.insert(block, color);
        self
    }

    pub fn with_fallback(mut self, fallback: [u8; 3]) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn insert(&mut self, block: impl Into<String>, color: [u8; 3]) {
        self.colors.insert(block.into(), color);
    }

    pub fn get(&self, block: &str) -> Option<[u8; 3]> {
        self.colors.get(block).copied()
    }

    pub fn fallback(&self) -> [u8; 3] {
        self.fallback
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Parses a JSON object of `"block": [r, g, b]` entries.
    pub fn from_json_str(json: &str) -> Result<Self, PaletteError> {
        let colors: HashMap<String, [u8; 3]> = serde_json::from_str(json)?;
        Ok(Self {
            colors,
            fallback: FALLBACK_COLOR,
        })
    }

    pub fn load(path: &Path) -> Result<Self, PaletteError> {
        let json = fs::read_to_string(path).map_err(|source| PaletteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// A small palette of common overworld surface blocks.
    pub fn overworld() -> Self {
        [
            ("minecraft:grass_block", [95, 159, 53]),
            ("minecraft:dirt", [134, 96, 67]),
            ("minecraft:coarse_dirt", [119, 85, 59]),
            ("minecraft:podzol", [91, 63, 24]),
            ("minecraft:mycelium", [111, 99, 105]),
            ("minecraft:stone", [125, 125, 125]),
            ("minecraft:andesite", [136, 136, 136]),
            ("minecraft:diorite", [188, 188, 188]),
            ("minecraft:granite", [149, 103, 85]),
            ("minecraft:gravel", [131, 127, 126]),
            ("minecraft:sand", [219, 207, 163]),
            ("minecraft:red_sand", [190, 102, 33]),
            ("minecraft:sandstone", [216, 203, 155]),
            ("minecraft:terracotta", [152, 94, 67]),
            ("minecraft:clay", [160, 166, 179]),
            ("minecraft:water", [63, 118, 228]),
            ("minecraft:lava", [207, 92, 20]),
            ("minecraft:ice", [145, 183, 253]),
            ("minecraft:packed_ice", [141, 180, 250]),
            ("minecraft:snow", [249, 254, 254]),
            ("minecraft:snow_block", [249, 254, 254]),
            ("minecraft:oak_leaves", [59, 122, 26]),
            ("minecraft:birch_leaves", [80, 128, 55]),
            ("minecraft:spruce_leaves", [45, 78, 45]),
            ("minecraft:jungle_leaves", [48, 133, 14]),
            ("minecraft:acacia_leaves", [67, 116, 23]),
            ("minecraft:dark_oak_leaves", [43, 95, 17]),
            ("minecraft:oak_log", [109, 85, 50]),
            ("minecraft:short_grass", [95, 159, 53]),
            ("minecraft:tall_grass", [95, 159, 53]),
            ("minecraft:seagrass", [28, 112, 31]),
            ("minecraft:kelp", [33, 110, 25]),
            ("minecraft:cobblestone", [127, 127, 127]),
            ("minecraft:oak_planks", [162, 130, 78]),
            ("minecraft:bedrock", [85, 85, 85]),
        ]
        .into_iter()
        .map(|(block, color)| (block.to_string(), color))
        .collect()
    }
}
