//! External collaborator interfaces.
//!
//! The storage core never talks to a real disk, physical-frame allocator or
//! page table directly — it is generic over these traits instead, so the
//! same code drives a real block device in production and an in-memory
//! double under test (see `testutil`).

use crate::error::DiskError;
use crate::param::SECTOR_SIZE;

/// Identifies a sector on the backing block device.
pub type SectorId = u32;

/// Sentinel for "no sector" (an inode with no data extent).
pub const NO_SECTOR: SectorId = SectorId::MAX;

/// A raw, synchronous block device addressed by fixed-size sectors.
pub trait BlockDevice {
    fn read(&self, sector: SectorId, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), DiskError>;
    fn write(&self, sector: SectorId, buf: &[u8; SECTOR_SIZE]) -> Result<(), DiskError>;
}

/// Reserves and releases contiguous runs of sectors for inode data extents.
pub trait SectorAllocator {
    /// Reserves `count` contiguous sectors, or `None` if no extent is free.
    fn allocate(&self, count: u32) -> Option<SectorId>;

    /// Returns `count` contiguous sectors starting at `first` to the free pool.
    fn release(&self, first: SectorId, count: u32);
}

/// Identifies a physical frame (kernel page) handed out by the allocator.
pub type KernelPage = usize;

/// Identifies a page-table entry slot. Opaque: the frame table never reads
/// through it, only compares it for identity.
pub type Pte = usize;

bitflags::bitflags! {
    /// Flags requested of a freshly allocated physical frame.
    pub struct PageFlags: u32 {
        /// Zero the frame's contents before handing it out.
        const ZERO = 1 << 0;
        /// The frame backs user-accessible memory.
        const USER = 1 << 1;
    }
}

/// Hands out and reclaims physical frames.
pub trait FrameAllocator {
    fn get_page(&self, flags: PageFlags) -> Option<KernelPage>;
    fn free_page(&self, page: KernelPage);
}

/// The virtual-to-physical mapping structure a frame is installed into.
pub trait PageTable {
    /// Returns the page-table-entry slot for `vaddr`, creating it if
    /// `create` is set and none exists yet.
    fn lookup(&self, vaddr: usize, create: bool) -> Option<Pte>;

    /// Returns the kernel page currently mapped at `vaddr`, if any.
    fn get_page(&self, vaddr: usize) -> Option<KernelPage>;

    /// Binds `vaddr` to `page`. Returns `false` without changing anything
    /// if `vaddr` is already bound.
    fn set_page(&self, vaddr: usize, page: KernelPage, writable: bool) -> bool;
}
