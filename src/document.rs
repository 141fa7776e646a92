//! Host document and off-screen containers.
//!
//! Exports mount their detached tree in an off-screen container sized to the
//! live preview. The container is registered with the [`Document`] for as
//! long as the returned [`OffscreenMount`] lives; dropping the guard removes
//! it, whether the export succeeded, failed or panicked.

use crate::tree::VisualTree;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Off-screen containers sit outside the viewport at this offset
pub const OFFSCREEN_OFFSET: i32 = -9999;

/// Position and size of a mounted container in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
struct ContainerRecord {
    id: u64,
    rect: ContainerRect,
}

/// The page the preview lives in; tracks off-screen containers
#[derive(Debug, Default)]
pub struct Document {
    next_id: AtomicU64,
    offscreen: Mutex<Vec<ContainerRecord>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `tree` in a new off-screen container of `width` x `height`
    pub fn mount_offscreen(&self, tree: VisualTree, width: u32, height: u32) -> OffscreenMount<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let rect = ContainerRect {
            left: OFFSCREEN_OFFSET,
            top: OFFSCREEN_OFFSET,
            width,
            height,
        };
        self.records().push(ContainerRecord { id, rect });
        log::debug!("mounted off-screen container {} ({}x{})", id, width, height);
        OffscreenMount {
            document: self,
            id,
            rect,
            tree,
        }
    }

    /// Number of containers currently attached
    pub fn offscreen_count(&self) -> usize {
        self.records().len()
    }

    pub fn offscreen_rects(&self) -> Vec<ContainerRect> {
        self.records().iter().map(|r| r.rect).collect()
    }

    fn unmount(&self, id: u64) {
        self.records().retain(|r| r.id != id);
        log::debug!("removed off-screen container {}", id);
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Vec<ContainerRecord>> {
        // a poisoned registry is still a valid list of records
        self.offscreen.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A detached tree mounted off-screen. Unmounts on drop.
#[derive(Debug)]
pub struct OffscreenMount<'d> {
    document: &'d Document,
    id: u64,
    rect: ContainerRect,
    pub tree: VisualTree,
}

impl OffscreenMount<'_> {
    pub fn rect(&self) -> ContainerRect {
        self.rect
    }
}

impl Drop for OffscreenMount<'_> {
    fn drop(&mut self) {
        self.document.unmount(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Element;

    #[test]
    fn mount_is_sized_and_removed_on_drop() {
        let doc = Document::new();
        {
            let mount = doc.mount_offscreen(VisualTree::new(Element::new("div")), 400, 300);
            assert_eq!(doc.offscreen_count(), 1);
            assert_eq!(
                mount.rect(),
                ContainerRect { left: -9999, top: -9999, width: 400, height: 300 }
            );
        }
        assert_eq!(doc.offscreen_count(), 0);
    }

    #[test]
    fn independent_mounts_do_not_interfere() {
        let doc = Document::new();
        let a = doc.mount_offscreen(VisualTree::new(Element::new("div")), 10, 10);
        let b = doc.mount_offscreen(VisualTree::new(Element::new("div")), 20, 20);
        drop(a);
        assert_eq!(doc.offscreen_rects(), vec![b.rect()]);
        drop(b);
        assert_eq!(doc.offscreen_count(), 0);
    }

    #[test]
    fn mount_is_removed_when_unwinding() {
        let doc = Document::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _mount = doc.mount_offscreen(VisualTree::new(Element::new("div")), 10, 10);
            panic!("export blew up");
        }));
        assert!(result.is_err());
        assert_eq!(doc.offscreen_count(), 0);
    }
}
