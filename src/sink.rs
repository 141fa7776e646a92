//! Bitmap delivery: file download or clipboard.
//!
//! Copy requests fall back to a download when the device is handheld or the
//! clipboard is unavailable, so a finished export is never lost.

use crate::platform::{ClipboardBackend, DeviceProfile, PlatformApi};
use crate::rendering::Bitmap;
use crate::{Error, Result};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Download,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Downloaded(PathBuf),
    Copied,
    /// The clipboard write failed and the image was downloaded instead
    CopyFallback { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// User-facing summary of a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub detail: String,
}

impl Notice {
    fn new(level: NoticeLevel, title: &str, detail: String) -> Self {
        Self { level, title: title.to_string(), detail }
    }

    /// Notice for an export or delivery that failed outright
    pub fn failure(requested: DeliveryMode, err: &Error) -> Self {
        let title = match requested {
            DeliveryMode::Copy => "Copy failed",
            DeliveryMode::Download => "Export failed",
        };
        Notice::new(NoticeLevel::Error, title, format!("{}. Please try again.", err))
    }
}

impl Outcome {
    pub fn notice(&self, requested: DeliveryMode) -> Notice {
        match (self, requested) {
            (Outcome::Downloaded(path), DeliveryMode::Download) => {
                Notice::new(NoticeLevel::Success, "Export succeeded", format!("Saved to {}", path.display()))
            }
            (Outcome::Downloaded(path), DeliveryMode::Copy) => {
                Notice::new(NoticeLevel::Success, "Image generated", format!("Saved to {}", path.display()))
            }
            (Outcome::Copied, _) => {
                Notice::new(NoticeLevel::Success, "Copied", "Image copied to the clipboard".to_string())
            }
            (Outcome::CopyFallback { path, reason }, _) => Notice::new(
                NoticeLevel::Warning,
                "Copy failed, image downloaded",
                format!("{}. Check clipboard permissions. Saved to {}", reason, path.display()),
            ),
        }
    }
}

/// `mark-pic-<epoch-ms>.png`
pub fn download_filename(epoch_ms: u128) -> String {
    format!("mark-pic-{}.png", epoch_ms)
}

/// Persists a PNG and reports where it went
pub trait Downloader {
    fn save(&self, png: &[u8]) -> Result<PathBuf>;
}

/// Writes timestamped files into a directory
#[derive(Debug, Clone)]
pub struct FileDownloader {
    dir: PathBuf,
}

impl FileDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `png` under the name for `epoch_ms`. An existing file is never
    /// replaced; repeats get a `-1`, `-2`, ... suffix.
    fn save_at(&self, epoch_ms: u128, png: &[u8]) -> Result<PathBuf> {
        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => download_filename(epoch_ms),
                n => format!("mark-pic-{}-{}.png", epoch_ms, n),
            };
            let path = self.dir.join(name);
            let opened = std::fs::OpenOptions::new().write(true).create_new(true).open(&path);
            match opened {
                Ok(mut file) => {
                    file.write_all(png)
                        .map_err(|e| Error::DownloadError(format!("{}: {}", path.display(), e)))?;
                    log::info!("saved {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(Error::DownloadError(format!("{}: {}", path.display(), e))),
            }
        }
    }
}

const MAX_NAME_ATTEMPTS: u32 = 1000;

impl Downloader for FileDownloader {
    fn save(&self, png: &[u8]) -> Result<PathBuf> {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.save_at(ms, png)
    }
}

pub struct OutputSink {
    downloader: Box<dyn Downloader>,
    clipboard: Option<Box<dyn ClipboardBackend>>,
    device: DeviceProfile,
}

impl OutputSink {
    pub fn new(
        downloader: Box<dyn Downloader>,
        clipboard: Option<Box<dyn ClipboardBackend>>,
        device: DeviceProfile,
    ) -> Self {
        Self { downloader, clipboard, device }
    }

    /// Clipboard is only opened when a copy can actually happen
    pub fn from_platform(platform: &dyn PlatformApi, downloader: Box<dyn Downloader>, requested: DeliveryMode) -> Self {
        let device = platform.device();
        let clipboard = if requested == DeliveryMode::Copy && !device.is_mobile() {
            platform.clipboard()
        } else {
            None
        };
        Self::new(downloader, clipboard, device)
    }

    pub fn deliver(&mut self, bitmap: &Bitmap, requested: DeliveryMode) -> Result<Outcome> {
        let png = bitmap.png_bytes()?;
        if requested == DeliveryMode::Download || self.device.is_mobile() {
            if requested == DeliveryMode::Copy {
                log::debug!("handheld device, downloading instead of copying");
            }
            return Ok(Outcome::Downloaded(self.downloader.save(&png)?));
        }

        let copied = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.write_png(&png),
            None => Err(Error::ClipboardError("no clipboard available".to_string())),
        };
        match copied {
            Ok(()) => Ok(Outcome::Copied),
            Err(e) => {
                log::warn!("clipboard write failed, downloading instead: {}", e);
                let path = self.downloader.save(&png)?;
                Ok(Outcome::CopyFallback { path, reason: e.to_string() })
            }
        }
    }
}
