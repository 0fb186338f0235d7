//! PNG encoding of rendered canvases.

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, PixelWithColorType};

use super::error::RenderError;

/// Encodes an image buffer as PNG bytes.
pub fn encode_png<P>(image: &ImageBuffer<P, Vec<P::Subpixel>>) -> Result<Vec<u8>, RenderError>
where
    P: PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}
