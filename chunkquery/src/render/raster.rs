//! Rasterization of a cached region.
//!
//! Chunk `(dx, dz)` relative to the region's north-west corner lands at
//! pixel column `dx·16 + x` and row `dz·16 + z` of both canvases.

use std::collections::{BTreeMap, BTreeSet};

use image::{GrayImage, Luma, Rgb, RgbImage};

use super::palette::BlockPalette;
use crate::cache::ChunkCache;
use crate::coord::{ChunkKey, Region, CHUNK_SIZE};

/// Both canvases of a region plus what was observed while painting them.
#[derive(Debug, Clone)]
pub struct Raster {
    size: u32,
    texture: RgbImage,
    /// Row-major height per pixel; `None` where no chunk data exists.
    heights: Vec<Option<i32>>,
    pub chunks_present: usize,
    pub chunks_missing: usize,
    /// Lowest and highest observed height.
    pub height_range: Option<(i32, i32)>,
    pub unassigned: BTreeSet<String>,
    pub block_counts: BTreeMap<String, u64>,
}

impl Raster {
    /// Edge length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn texture(&self) -> &RgbImage {
        &self.texture
    }

    pub fn height_at(&self, column: u32, row: u32) -> Option<i32> {
        if column >= self.size || row >= self.size {
            return None;
        }
        self.heights[pixel_index(column, row, self.size)]
    }

    /// Builds the normalized 8-bit heightmap.
    ///
    /// Gaps are 0. If nothing was painted, or every painted height is the
    /// same, the whole image is 0.
    pub fn heightmap(&self) -> GrayImage {
        let mut image = GrayImage::new(self.size, self.size);
        let (min, max) = match self.height_range {
            Some((min, max)) if max > min => (min, max),
            _ => return image,
        };

        let side = self.size as usize;
        for (i, height) in self.heights.iter().enumerate() {
            if let Some(h) = height {
                let column = (i % side) as u32;
                let row = (i / side) as u32;
                image.put_pixel(column, row, Luma([normalize(*h, min, max)]));
            }
        }
        image
    }
}

#[inline]
fn pixel_index(column: u32, row: u32, size: u32) -> usize {
    row as usize * size as usize + column as usize
}

/// Maps `height` from `[min, max]` onto `[0, 255]`, truncating.
///
/// Callers guarantee `min < max`.
pub fn normalize(height: i32, min: i32, max: i32) -> u8 {
    let span = (max as i64 - min as i64) as f64;
    let offset = (height as i64 - min as i64) as f64;
    (offset / span * 255.0) as u8
}

/// Paints every cached chunk of `region` in `world`.
///
/// Missing chunks are left as gaps: black on the texture, no height. Cells a
/// malformed record does not provide are treated the same way.
pub fn rasterize(
    region: &Region,
    world: &str,
    cache: &ChunkCache,
    palette: &BlockPalette,
) -> Raster {
    let size = region.pixel_size();
    let mut raster = Raster {
        size,
        texture: RgbImage::new(size, size),
        heights: vec![None; (size as usize) * (size as usize)],
        chunks_present: 0,
        chunks_missing: 0,
        height_range: None,
        unassigned: BTreeSet::new(),
        block_counts: BTreeMap::new(),
    };

    for chunk in region.chunks() {
        let Some(record) = cache.get(&ChunkKey::at(world, chunk.coord)) else {
            raster.chunks_missing += 1;
            continue;
        };
        raster.chunks_present += 1;

        let (base_column, base_row) = chunk.pixel_origin();
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                let (Some(height), Some(block)) = (record.height_at(x, z), record.block_at(x, z))
                else {
                    continue;
                };

                let column = base_column + x as u32;
                let row = base_row + z as u32;

                raster.height_range = Some(match raster.height_range {
                    None => (height, height),
                    Some((lo, hi)) => (lo.min(height), hi.max(height)),
                });
                raster.heights[pixel_index(column, row, size)] = Some(height);

                *raster.block_counts.entry(block.to_string()).or_insert(0) += 1;

                let color = match palette.get(block) {
                    Some(color) => color,
                    None => {
                        if !raster.unassigned.contains(block) {
                            raster.unassigned.insert(block.to_string());
                        }
                        palette.fallback()
                    }
                };
                raster.texture.put_pixel(column, row, Rgb(color));
            }
        }
    }

    raster
}
