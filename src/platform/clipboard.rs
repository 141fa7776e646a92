/// System clipboard access

use crate::{Error, Result};

/// Writes one image entry to a clipboard
pub trait ClipboardBackend {
    /// Place `png` on the clipboard as a single image
    fn write_png(&mut self, png: &[u8]) -> Result<()>;
}

/// Decode PNG bytes to straight RGBA8: (width, height, pixels)
pub fn decode_rgba(png: &[u8]) -> Result<(u32, u32, Vec<u8>)> {
    let img = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| Error::ClipboardError(format!("Failed to decode PNG: {}", e)))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    Ok((w, h, img.into_raw()))
}

/// `arboard`-backed system clipboard
#[cfg(feature = "clipboard")]
pub struct ArboardClipboard {
    inner: arboard::Clipboard,
}

#[cfg(feature = "clipboard")]
impl ArboardClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new()
            .map_err(|e| Error::ClipboardError(format!("Clipboard unavailable: {}", e)))?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "clipboard")]
impl ClipboardBackend for ArboardClipboard {
    fn write_png(&mut self, png: &[u8]) -> Result<()> {
        let (width, height, bytes) = decode_rgba(png)?;
        self.inner
            .set_image(arboard::ImageData {
                width: width as usize,
                height: height as usize,
                bytes: std::borrow::Cow::Owned(bytes),
            })
            .map_err(|e| Error::ClipboardError(format!("Failed to write image: {}", e)))?;
        log::debug!("wrote {}x{} image to clipboard", width, height);
        Ok(())
    }
}

/// In-memory clipboard; keeps the last decoded image
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub last: Option<(u32, u32, Vec<u8>)>,
}

impl ClipboardBackend for MemoryClipboard {
    fn write_png(&mut self, png: &[u8]) -> Result<()> {
        self.last = Some(decode_rgba(png)?);
        Ok(())
    }
}
