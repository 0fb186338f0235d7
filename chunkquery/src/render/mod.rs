//! Region rendering.
//!
//! Turns a square region of the chunk cache into two PNGs: an 8-bit
//! heightmap normalized over the region's observed height range, and an RGB
//! texture map colored by surface block.

mod encode;
mod error;
mod palette;
mod pipeline;
mod raster;

pub use encode::encode_png;
pub use error::RenderError;
pub use palette::{BlockPalette, PaletteError, FALLBACK_COLOR};
pub use pipeline::{
    RenderBarrier, RenderConfig, RenderPipeline, RenderReport, RenderServices, RenderState,
    RenderTask,
};
pub use raster::{normalize, rasterize, Raster};
