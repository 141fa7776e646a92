//! markpic
//!
//! Renders Markdown into a styled card and exports the card as a PNG image,
//! either saved to disk or placed on the system clipboard.
//!
//! # Pipeline
//!
//! - **Preview**: Markdown is rendered to a visual tree styled from a
//!   [`StyleConfig`] and the current [`Mode`]
//! - **Export**: the [`Rasterizer`] snapshots the live preview into a detached
//!   copy, recolors diagrams for the mode, resolves external images and
//!   rasterizes the copy at 2x density
//! - **Delivery**: the [`OutputSink`] writes the bitmap to a file or the
//!   clipboard, falling back to a file when the clipboard is unavailable
//!
//! # Example
//!
//! ```no_run
//! use markpic::{Document, ExportOptions, Mode, PreviewElement, Rasterizer, StyleConfig};
//! use markpic::images::HttpImageLoader;
//! use std::sync::Arc;
//!
//! # async fn run() -> markpic::Result<()> {
//! let preview = PreviewElement::from_markdown("# Hello", &StyleConfig::default(), Mode::Light)?;
//! let document = Document::new();
//! let loader = Arc::new(HttpImageLoader::new("markpic/0.1")?);
//! let rasterizer = Rasterizer::new(&document, loader, ExportOptions::default());
//! let bitmap = rasterizer.export_to_image(&preview, Mode::Light, |phase| {
//!     println!("{}", phase.message());
//! }).await?;
//! println!("{}x{}", bitmap.width, bitmap.height);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod diagram;
pub mod document;
pub mod export;
pub mod images;
pub mod platform;
pub mod preview;
pub mod rendering;
pub mod sink;
pub mod style;
pub mod tree;

pub use document::Document;
pub use export::{ExportOptions, ExportPhase, Rasterizer};
pub use preview::PreviewElement;
pub use rendering::Bitmap;
pub use sink::{DeliveryMode, OutputSink, Outcome};
pub use style::{resolve, StyleConfig};
pub use tree::VisualTree;

/// Application color mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Light,
    Dark,
}

impl Mode {
    pub fn is_dark(self) -> bool {
        self == Mode::Dark
    }

    pub fn from_dark(dark: bool) -> Self {
        if dark {
            Mode::Dark
        } else {
            Mode::Light
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_defaults_to_light() {
        assert_eq!(Mode::default(), Mode::Light);
        assert!(Mode::from_dark(true).is_dark());
        assert!(!Mode::from_dark(false).is_dark());
    }
}
