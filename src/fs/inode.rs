//! Open-inode table.
//!
//! Each inode lives in one sector: a header (see `codec`) followed by
//! nothing else — the header names the data extent's first sector and
//! byte length directly, rather than a block-pointer tree.
//!
//! Opening the same on-disk sector twice must hand back the same handle:
//! the table scans its open set by sector number, bumping `open_cnt` on a
//! hit rather than creating a second entry. Deleting an open inode is
//! deferred — `remove` just flags it; the data extent and header sector
//! only go back to the allocator when the last opener closes it
//! (`open_cnt` reaches zero). A reservation count (`deny_write_cnt`) blocks
//! writers independent of the open count, and can never exceed it.

use std::sync::Arc;

use log::{debug, trace};

use crate::bio::BufferCache;
use crate::error::{CoreError, Result};
use crate::fs::codec::DiskInode;
use crate::hal::{BlockDevice, SectorAllocator, SectorId, NO_SECTOR};
use crate::param::SECTOR_SIZE;

struct OpenInodeInner<D: BlockDevice> {
    sector: SectorId,
    open_cnt: u32,
    deny_write_cnt: u32,
    removed: bool,
    data: DiskInode,
    cache: Arc<BufferCache<D>>,
}

/// A handle to an open inode. Cloning it is how callers share the same
/// underlying inode; every clone refers to the same `open_cnt` slot.
pub struct Inode<D: BlockDevice>(Arc<spin::Mutex<OpenInodeInner<D>>>);

impl<D: BlockDevice> Clone for Inode<D> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<D: BlockDevice> Inode<D> {
    /// Reopens a possibly-absent handle, bumping its open count. Safe on
    /// `None` (returns `None`).
    pub fn reopen(this: Option<&Self>) -> Option<Self> {
        let this = this?;
        this.0.lock().open_cnt += 1;
        Some(this.clone())
    }

    /// Current length in bytes.
    pub fn length(&self) -> i32 {
        self.0.lock().data.length
    }

    /// Flags this inode for deletion once the last opener closes it.
    pub fn remove(&self) {
        self.0.lock().removed = true;
    }

    /// Reserves a deny-write slot, blocking writers until matched by
    /// [`Inode::allow_write`].
    pub fn deny_write(&self) {
        let mut inner = self.0.lock();
        assert!(inner.deny_write_cnt < inner.open_cnt, "deny_write_cnt would exceed open_cnt");
        inner.deny_write_cnt += 1;
    }

    /// Releases a deny-write reservation taken by [`Inode::deny_write`].
    pub fn allow_write(&self) {
        let mut inner = self.0.lock();
        assert!(inner.deny_write_cnt > 0, "allow_write without a matching deny_write");
        inner.deny_write_cnt -= 1;
    }

    /// Reads up to `size` bytes at `offset` into `dst`, clipped at
    /// end-of-file. Returns the number of bytes actually read — silently
    /// short on a read that runs past the end of the file.
    pub fn read_at(&self, dst: &mut [u8], size: usize, offset: usize) -> Result<usize> {
        let (cache, start, length) = {
            let inner = self.0.lock();
            (inner.cache.clone(), inner.data.start, inner.data.length.max(0) as usize)
        };
        let mut total = 0usize;
        let mut off = offset;
        let mut remaining = size.min(dst.len());
        while remaining > 0 && off < length {
            let sector = start + (off / SECTOR_SIZE) as u32;
            let in_sector = off % SECTOR_SIZE;
            let chunk = remaining.min(SECTOR_SIZE - in_sector).min(length - off);
            cache.read(sector, &mut dst[total..total + chunk], in_sector, chunk)?;
            total += chunk;
            off += chunk;
            remaining -= chunk;
        }
        Ok(total)
    }

    /// Writes up to `size` bytes from `src` at `offset`. Refused (returns
    /// `0`) while a deny-write reservation is held, or past end-of-file —
    /// this layer never grows a file's extent.
    pub fn write_at(&self, src: &[u8], size: usize, offset: usize) -> Result<usize> {
        let (cache, start, length, denied) = {
            let inner = self.0.lock();
            (
                inner.cache.clone(),
                inner.data.start,
                inner.data.length.max(0) as usize,
                inner.deny_write_cnt > 0,
            )
        };
        if denied {
            trace!("fs: write refused, deny_write_cnt > 0");
            return Ok(0);
        }
        let mut total = 0usize;
        let mut off = offset;
        let mut remaining = size.min(src.len());
        while remaining > 0 && off < length {
            let sector = start + (off / SECTOR_SIZE) as u32;
            let in_sector = off % SECTOR_SIZE;
            let chunk = remaining.min(SECTOR_SIZE - in_sector).min(length - off);
            cache.write(sector, &src[total..total + chunk], in_sector, chunk)?;
            total += chunk;
            off += chunk;
            remaining -= chunk;
        }
        Ok(total)
    }
}

/// The set of currently open inodes, deduplicated by header sector.
pub struct InodeTable<D: BlockDevice, A: SectorAllocator> {
    cache: Arc<BufferCache<D>>,
    allocator: A,
    open: spin::Mutex<Vec<Inode<D>>>,
}

impl<D: BlockDevice, A: SectorAllocator> InodeTable<D, A> {
    pub fn new(cache: Arc<BufferCache<D>>, allocator: A) -> Self {
        Self { cache, allocator, open: spin::Mutex::new(Vec::new()) }
    }

    /// Allocates a data extent of `length` bytes and writes a fresh header
    /// to `sector`. `sector` itself is not allocated by this call — the
    /// caller already owns it (e.g. from a directory entry).
    pub fn create(&self, sector: SectorId, length: i32) -> Result<()> {
        assert!(length >= 0, "inode length must be non-negative");
        let nsectors = (length as usize).div_ceil(SECTOR_SIZE) as u32;
        let start = if nsectors == 0 {
            NO_SECTOR
        } else {
            self.allocator.allocate(nsectors).ok_or(CoreError::OutOfDiskSpace)?
        };
        if nsectors > 0 {
            let zero = [0u8; SECTOR_SIZE];
            for i in 0..nsectors {
                self.cache.write(start + i, &zero, 0, SECTOR_SIZE)?;
            }
        }
        let header = DiskInode::new(start, length);
        self.cache.write(sector, &header.encode(), 0, SECTOR_SIZE)?;
        debug!("fs: create inode at sector {sector}, start {start}, length {length}");
        Ok(())
    }

    /// Opens the inode whose header lives at `sector`, sharing state with
    /// any other open handle to the same sector.
    pub fn open(&self, sector: SectorId) -> Result<Inode<D>> {
        let mut open = self.open.lock();
        for inode in open.iter() {
            let mut inner = inode.0.lock();
            if inner.sector == sector {
                inner.open_cnt += 1;
                trace!("fs: open sector {sector} reuses existing handle");
                drop(inner);
                return Ok(inode.clone());
            }
        }

        let mut buf = [0u8; SECTOR_SIZE];
        self.cache.read(sector, &mut buf, 0, SECTOR_SIZE)?;
        let data = DiskInode::decode(&buf);
        let inode = Inode(Arc::new(spin::Mutex::new(OpenInodeInner {
            sector,
            open_cnt: 1,
            deny_write_cnt: 0,
            removed: false,
            data,
            cache: self.cache.clone(),
        })));
        open.push(inode.clone());
        trace!("fs: open sector {sector} loads a fresh handle");
        Ok(inode)
    }

    /// Drops one open reference to `inode`. Safe on `None`. When the last
    /// opener closes a removed inode, its header sector and data extent
    /// are released back to the allocator.
    pub fn close(&self, inode: Option<Inode<D>>) {
        let Some(inode) = inode else { return };
        let mut open = self.open.lock();

        let last_close = {
            let mut inner = inode.0.lock();
            assert!(inner.open_cnt > 0, "close on an inode with zero open_cnt");
            inner.open_cnt -= 1;
            inner.open_cnt == 0
        };
        if !last_close {
            return;
        }

        open.retain(|other| !Arc::ptr_eq(&other.0, &inode.0));
        drop(open);

        let (removed, sector, start, length) = {
            let inner = inode.0.lock();
            (inner.removed, inner.sector, inner.data.start, inner.data.length)
        };
        if removed {
            debug!("fs: releasing removed inode at sector {sector}");
            let nsectors = (length.max(0) as usize).div_ceil(SECTOR_SIZE) as u32;
            if nsectors > 0 {
                self.allocator.release(start, nsectors);
            }
            self.allocator.release(sector, 1);
        }
    }
}
