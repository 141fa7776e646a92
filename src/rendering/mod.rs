//! Rendering pipeline: layout, display list and rasterization

pub mod layout;
pub mod paint;
pub mod raster;

use crate::{Error, Result};
use base64::Engine as _;

/// A rasterized export. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// Width in device pixels
    pub width: u32,
    /// Height in device pixels
    pub height: u32,
    /// `data:image/png;base64,...`
    pub data_url: String,
}

const PNG_PREFIX: &str = "data:image/png;base64,";

impl Bitmap {
    pub fn from_png(width: u32, height: u32, png: &[u8]) -> Self {
        Self {
            width,
            height,
            data_url: format!(
                "{}{}",
                PNG_PREFIX,
                base64::engine::general_purpose::STANDARD.encode(png)
            ),
        }
    }

    /// Decoded PNG payload of the data URL
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let encoded = self
            .data_url
            .strip_prefix(PNG_PREFIX)
            .ok_or_else(|| Error::Other("bitmap is not a PNG data URL".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::Other(format!("corrupt bitmap data: {}", e)))
    }
}

/// Lay out and rasterize `tree` at `width` x `height` CSS pixels.
///
/// `text_fill` is forced onto diagram text while serializing.
pub fn render_tree(
    tree: &crate::tree::VisualTree,
    width: u32,
    height: u32,
    pixel_ratio: f32,
    text_fill: &str,
) -> Result<Bitmap> {
    let list = paint::build_display_list(tree, width as f32, text_fill);
    log::debug!(
        "display list: {} command(s), {} broken image(s)",
        list.commands.len(),
        list.broken_images()
    );
    let svg = raster::compose_svg(&list, width, height);
    let png = raster::rasterize_svg(&svg, width, height, pixel_ratio)?;
    Ok(Bitmap::from_png(
        (width as f32 * pixel_ratio).round() as u32,
        (height as f32 * pixel_ratio).round() as u32,
        &png,
    ))
}
