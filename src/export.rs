//! Export pipeline.
//!
//! [`Rasterizer::export_to_image`] snapshots the live preview into a detached
//! copy, recolors diagrams for the current mode, mounts the copy off-screen,
//! resolves its images, waits for the layout to settle and rasterizes it.
//! The live preview is only ever borrowed immutably.

use crate::diagram::{self, THEME_COLORS};
use crate::document::Document;
use crate::images::{self, ImageLoader, ImageOptions};
use crate::preview::PreviewElement;
use crate::rendering::{self, Bitmap};
use crate::tree::VisualTree;
use crate::{Mode, Result};
use std::sync::Arc;
use std::time::Duration;

/// Default device-pixel multiplier
pub const DEFAULT_PIXEL_RATIO: f32 = 2.0;
/// Default wait between mounting and rasterizing
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 200;

/// Export progress, reported in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportPhase {
    Preparing,
    NormalizingDiagrams,
    ResolvingImages,
    ApplyingStyles,
    Rasterizing,
    Done,
}

impl ExportPhase {
    /// Stable machine-readable label
    pub fn label(self) -> &'static str {
        match self {
            ExportPhase::Preparing => "preparing",
            ExportPhase::NormalizingDiagrams => "normalizing-diagrams",
            ExportPhase::ResolvingImages => "resolving-images",
            ExportPhase::ApplyingStyles => "applying-styles",
            ExportPhase::Rasterizing => "rasterizing",
            ExportPhase::Done => "done",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ExportPhase::Preparing => "Preparing export...",
            ExportPhase::NormalizingDiagrams => "Processing diagram colors...",
            ExportPhase::ResolvingImages => "Loading images...",
            ExportPhase::ApplyingStyles => "Applying styles...",
            ExportPhase::Rasterizing => "Generating image...",
            ExportPhase::Done => "Export complete",
        }
    }
}

impl std::fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Export configuration
///
/// # Examples
///
/// ```
/// let opts = markpic::ExportOptions::default();
/// assert_eq!(opts.pixel_ratio, 2.0);
/// assert_eq!(opts.settle_delay_ms, 200);
/// ```
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output pixels per CSS pixel
    pub pixel_ratio: f32,
    /// Wait after mounting before rasterizing; 0 skips the wait
    pub settle_delay_ms: u64,
    /// Image resolution settings
    pub images: ImageOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            images: ImageOptions::default(),
        }
    }
}

/// Turns a prepared tree into pixels
pub trait RasterBackend: Send + Sync {
    /// Rasterize `tree` laid out at `width` x `height` CSS pixels
    fn rasterize(&self, tree: &VisualTree, width: u32, height: u32, pixel_ratio: f32, mode: Mode) -> Result<Bitmap>;
}

/// Layout + display list + resvg
#[derive(Debug, Default)]
pub struct SvgRasterBackend;

impl RasterBackend for SvgRasterBackend {
    fn rasterize(&self, tree: &VisualTree, width: u32, height: u32, pixel_ratio: f32, mode: Mode) -> Result<Bitmap> {
        let text_fill = THEME_COLORS.get(mode).text;
        rendering::render_tree(tree, width, height, pixel_ratio, text_fill)
    }
}

pub struct Rasterizer<'d> {
    document: &'d Document,
    loader: Arc<dyn ImageLoader>,
    backend: Box<dyn RasterBackend>,
    options: ExportOptions,
}

impl<'d> Rasterizer<'d> {
    pub fn new(document: &'d Document, loader: Arc<dyn ImageLoader>, options: ExportOptions) -> Self {
        Self {
            document,
            loader,
            backend: Box::new(SvgRasterBackend),
            options,
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn RasterBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export `live` as a PNG bitmap at the configured pixel ratio.
    ///
    /// `on_progress` sees every phase in order; `Done` only on success. The
    /// off-screen container is gone by the time this returns, either way.
    pub async fn export_to_image<F>(&self, live: &PreviewElement, mode: Mode, mut on_progress: F) -> Result<Bitmap>
    where
        F: FnMut(ExportPhase),
    {
        let result = self.run(live, mode, &mut on_progress).await;
        match &result {
            Ok(bitmap) => {
                log::debug!("export finished: {}x{}", bitmap.width, bitmap.height);
                on_progress(ExportPhase::Done);
            }
            Err(e) => log::error!("export failed: {}", e),
        }
        result
    }

    async fn run(&self, live: &PreviewElement, mode: Mode, on_progress: &mut dyn FnMut(ExportPhase)) -> Result<Bitmap> {
        let mut step = |phase: ExportPhase| {
            log::debug!("export phase: {}", phase);
            on_progress(phase);
        };

        step(ExportPhase::Preparing);
        let (width, height) = (live.width, live.height);
        let mut copy = live.tree.detached_copy();

        step(ExportPhase::NormalizingDiagrams);
        diagram::normalize(&mut copy, THEME_COLORS.get(mode));

        let mut mount = self.document.mount_offscreen(copy, width, height);

        step(ExportPhase::ResolvingImages);
        images::prepare(&mut mount.tree, self.loader.as_ref(), &self.options.images).await;

        step(ExportPhase::ApplyingStyles);
        if self.options.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.options.settle_delay_ms)).await;
        }

        step(ExportPhase::Rasterizing);
        let rect = mount.rect();
        self.backend
            .rasterize(&mount.tree, rect.width, rect.height, self.options.pixel_ratio, mode)
    }
}
