//! Platform surface: device classification and clipboard access
//!
//! The output sink only talks to these traits, so tests can swap in
//! deterministic implementations.

pub mod clipboard;
pub mod device;

pub use clipboard::{ClipboardBackend, MemoryClipboard};
pub use device::DeviceProfile;

/// User agent sent with image requests and used for device classification
pub const DEFAULT_USER_AGENT: &str = concat!("markpic/", env!("CARGO_PKG_VERSION"));

/// What the host platform offers the sink
pub trait PlatformApi {
    fn device(&self) -> DeviceProfile;
    /// `None` when no clipboard is reachable
    fn clipboard(&self) -> Option<Box<dyn ClipboardBackend>>;
}

/// The machine the process runs on
pub struct NativePlatform {
    device: DeviceProfile,
}

impl NativePlatform {
    pub fn new(device: DeviceProfile) -> Self {
        NativePlatform { device }
    }
}

impl Default for NativePlatform {
    fn default() -> Self {
        Self::new(DeviceProfile::default())
    }
}

impl PlatformApi for NativePlatform {
    fn device(&self) -> DeviceProfile {
        self.device.clone()
    }

    #[cfg(feature = "clipboard")]
    fn clipboard(&self) -> Option<Box<dyn ClipboardBackend>> {
        match clipboard::ArboardClipboard::new() {
            Ok(c) => Some(Box::new(c)),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }

    #[cfg(not(feature = "clipboard"))]
    fn clipboard(&self) -> Option<Box<dyn ClipboardBackend>> {
        None
    }
}

/// Desktop device without a clipboard
pub struct HeadlessPlatform;

impl PlatformApi for HeadlessPlatform {
    fn device(&self) -> DeviceProfile {
        DeviceProfile::default()
    }

    fn clipboard(&self) -> Option<Box<dyn ClipboardBackend>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_platform_is_desktop_without_clipboard() {
        let p = HeadlessPlatform;
        assert!(!p.device().is_mobile());
        assert!(p.clipboard().is_none());
    }
}
