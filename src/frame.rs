//! Frame table.
//!
//! Tracks, for every physical frame currently handed out, the set of
//! page-table entries that reference it. `get_page` allocates a frame and
//! installs it at a virtual address, refusing to replace an existing
//! mapping. `free_page` drops one referent; once a frame's referent set is
//! empty it is returned to the frame allocator. Both operations are keyed
//! lookups (kernel page -> frame entry, and pte -> the kernel page it
//! currently names) rather than a linear scan.

use std::collections::HashMap;

use log::{debug, trace};

use crate::error::{CoreError, Result};
use crate::hal::{FrameAllocator, KernelPage, PageFlags, PageTable, Pte};

struct FrameEntry {
    referents: Vec<Pte>,
}

struct Inner {
    frames: HashMap<KernelPage, FrameEntry>,
    pte_owner: HashMap<Pte, KernelPage>,
    order: Vec<KernelPage>,
}

pub struct FrameTable<F: FrameAllocator, P: PageTable> {
    frame_allocator: F,
    page_table: P,
    inner: spin::Mutex<Inner>,
}

impl<F: FrameAllocator, P: PageTable> FrameTable<F, P> {
    pub fn new(frame_allocator: F, page_table: P) -> Self {
        Self {
            frame_allocator,
            page_table,
            inner: spin::Mutex::new(Inner {
                frames: HashMap::new(),
                pte_owner: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Allocates a frame and installs it at `vaddr`. Fails with
    /// [`CoreError::AlreadyMapped`] without touching the frame allocator's
    /// account if `vaddr` is already bound — the freshly allocated frame
    /// is released back before returning.
    pub fn get_page(&self, flags: PageFlags, vaddr: usize, writable: bool) -> Result<KernelPage> {
        let kpage = self.frame_allocator.get_page(flags).ok_or(CoreError::OutOfMemory)?;
        if !self.page_table.set_page(vaddr, kpage, writable) {
            self.frame_allocator.free_page(kpage);
            return Err(CoreError::AlreadyMapped);
        }
        let pte = self
            .page_table
            .lookup(vaddr, true)
            .expect("set_page just installed this mapping");

        let mut inner = self.inner.lock();
        if !inner.frames.contains_key(&kpage) {
            inner.order.push(kpage);
            inner.frames.insert(kpage, FrameEntry { referents: Vec::new() });
        }
        inner.frames.get_mut(&kpage).unwrap().referents.push(pte);
        inner.pte_owner.insert(pte, kpage);
        trace!("frame: {kpage} now has {} referent(s)", inner.frames[&kpage].referents.len());
        Ok(kpage)
    }

    /// Removes `pte` as a referent of whatever kernel page it currently
    /// names. If that was the last referent, the frame is released. A
    /// `pte` this table has never seen is a no-op.
    pub fn free_page(&self, pte: Pte) {
        let mut inner = self.inner.lock();
        let Some(kpage) = inner.pte_owner.remove(&pte) else {
            return;
        };
        let now_empty = {
            let entry = inner
                .frames
                .get_mut(&kpage)
                .expect("pte_owner pointed at a frame entry that doesn't exist");
            entry.referents.retain(|&p| p != pte);
            entry.referents.is_empty()
        };
        if now_empty {
            inner.frames.remove(&kpage);
            inner.order.retain(|&k| k != kpage);
            debug!("frame: {kpage} has no referents left, releasing");
            self.frame_allocator.free_page(kpage);
        }
    }

    /// Number of frames currently live (allocated and referenced).
    pub fn live_frame_count(&self) -> usize {
        self.inner.lock().order.len()
    }

    /// Number of page-table entries currently referencing `kpage`.
    pub fn referent_count(&self, kpage: KernelPage) -> usize {
        self.inner.lock().frames.get(&kpage).map_or(0, |entry| entry.referents.len())
    }
}
