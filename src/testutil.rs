//! In-memory collaborator doubles used only by `#[cfg(test)]` modules.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::DiskError;
use crate::hal::{BlockDevice, FrameAllocator, KernelPage, PageFlags, PageTable, Pte, SectorAllocator, SectorId};
use crate::param::SECTOR_SIZE;

pub(crate) fn init_logger() {
    let _ = env_logger::Builder::new()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();
}

/// A block device backed by a `Vec` of sectors held entirely in memory.
pub(crate) struct MemDisk(Mutex<Vec<[u8; SECTOR_SIZE]>>);

impl MemDisk {
    pub(crate) fn new(sectors: usize) -> Self {
        Self(Mutex::new(vec![[0u8; SECTOR_SIZE]; sectors]))
    }

    pub(crate) fn seed(&self, sector: SectorId, data: [u8; SECTOR_SIZE]) {
        self.0.lock().unwrap()[sector as usize] = data;
    }
}

impl BlockDevice for MemDisk {
    fn read(&self, sector: SectorId, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), DiskError> {
        let disk = self.0.lock().unwrap();
        let src = disk.get(sector as usize).ok_or(DiskError::OutOfRange(sector))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write(&self, sector: SectorId, buf: &[u8; SECTOR_SIZE]) -> Result<(), DiskError> {
        let mut disk = self.0.lock().unwrap();
        let dst = disk.get_mut(sector as usize).ok_or(DiskError::OutOfRange(sector))?;
        dst.copy_from_slice(buf);
        Ok(())
    }
}

/// A sector allocator that only ever grows a watermark; it never reclaims
/// released extents, which is fine for tests that don't exhaust the disk.
pub(crate) struct BumpSectorAllocator {
    next: Mutex<SectorId>,
    capacity: SectorId,
}

impl BumpSectorAllocator {
    /// `start` should sit past whatever range of sectors the caller reserves
    /// for inode headers out of band — this allocator only ever grows.
    pub(crate) fn new(start: SectorId, capacity: SectorId) -> Self {
        Self { next: Mutex::new(start), capacity }
    }
}

impl SectorAllocator for BumpSectorAllocator {
    fn allocate(&self, count: u32) -> Option<SectorId> {
        let mut next = self.next.lock().unwrap();
        if *next + count > self.capacity {
            return None;
        }
        let first = *next;
        *next += count;
        Some(first)
    }

    fn release(&self, _first: SectorId, _count: u32) {}
}

/// A frame allocator that hands out ever-increasing fake page identities.
pub(crate) struct BumpFrameAllocator {
    next: Mutex<KernelPage>,
    capacity: KernelPage,
}

impl BumpFrameAllocator {
    pub(crate) fn new(capacity: KernelPage) -> Self {
        Self { next: Mutex::new(0), capacity }
    }
}

impl FrameAllocator for BumpFrameAllocator {
    fn get_page(&self, _flags: PageFlags) -> Option<KernelPage> {
        let mut next = self.next.lock().unwrap();
        if *next >= self.capacity {
            return None;
        }
        let page = *next;
        *next += 1;
        Some(page)
    }

    fn free_page(&self, _page: KernelPage) {}
}

/// A page table double: a plain map from virtual address to (page, writable).
/// The virtual address itself stands in for the opaque `Pte` identity.
pub(crate) struct MapPageTable(Mutex<HashMap<usize, (KernelPage, bool)>>);

impl MapPageTable {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(HashMap::new()))
    }
}

impl PageTable for MapPageTable {
    fn lookup(&self, vaddr: usize, _create: bool) -> Option<Pte> {
        self.0.lock().unwrap().contains_key(&vaddr).then_some(vaddr)
    }

    fn get_page(&self, vaddr: usize) -> Option<KernelPage> {
        self.0.lock().unwrap().get(&vaddr).map(|(page, _)| *page)
    }

    fn set_page(&self, vaddr: usize, page: KernelPage, writable: bool) -> bool {
        let mut map = self.0.lock().unwrap();
        if map.contains_key(&vaddr) {
            return false;
        }
        map.insert(vaddr, (page, writable));
        true
    }
}
