//! Sector buffer cache.
//!
//! A fixed array of slots, each independently lockable. A hit never takes
//! more than one slot-lock. A miss takes a dedicated eviction lock that
//! serializes victim selection across the whole cache — clock (second-
//! chance) scans the slots starting from wherever the hand last stopped,
//! clearing the access bit of anything it passes over and installing the
//! new sector into the first slot it finds either free or already-cleared.
//! The eviction lock is released as soon as a slot is claimed, before the
//! caller's bytes are copied in or out.

use array_macro::array;
use log::trace;

use crate::error::Result;
use crate::hal::{BlockDevice, SectorId, NO_SECTOR};
use crate::param::{NBUF, SECTOR_SIZE};

struct Slot {
    sector: SectorId,
    alloc: bool,
    access: bool,
    dirty: bool,
    data: [u8; SECTOR_SIZE],
}

impl Slot {
    const fn empty() -> Self {
        Self {
            sector: NO_SECTOR,
            alloc: false,
            access: false,
            dirty: false,
            data: [0; SECTOR_SIZE],
        }
    }
}

struct Clock {
    hand: usize,
}

/// A sector buffer cache over `N` slots (defaults to [`NBUF`]).
pub struct BufferCache<D: BlockDevice, const N: usize = NBUF> {
    slots: [spin::Mutex<Slot>; N],
    eviction: spin::Mutex<Clock>,
    device: D,
}

impl<D: BlockDevice, const N: usize> BufferCache<D, N> {
    pub fn new(device: D) -> Self {
        Self {
            slots: array![_ => spin::Mutex::new(Slot::empty()); N],
            eviction: spin::Mutex::new(Clock { hand: 0 }),
            device,
        }
    }

    /// Copies `length` bytes starting at `offset` within `sector` into `dst`.
    pub fn read(&self, sector: SectorId, dst: &mut [u8], offset: usize, length: usize) -> Result<()> {
        assert!(offset + length <= SECTOR_SIZE, "buffer cache read out of sector bounds");
        let slot = self.access_slot(sector, false)?;
        dst[..length].copy_from_slice(&slot.data[offset..offset + length]);
        Ok(())
    }

    /// Copies `length` bytes from `src` into `sector` starting at `offset`.
    pub fn write(&self, sector: SectorId, src: &[u8], offset: usize, length: usize) -> Result<()> {
        assert!(offset + length <= SECTOR_SIZE, "buffer cache write out of sector bounds");
        let mut slot = self.access_slot(sector, true)?;
        slot.data[offset..offset + length].copy_from_slice(&src[..length]);
        Ok(())
    }

    /// Writes back every dirty resident slot without evicting it.
    pub fn flush_all(&self) -> Result<()> {
        for slot_lock in self.slots.iter() {
            let mut slot = slot_lock.lock();
            if slot.alloc && slot.dirty {
                self.device.write(slot.sector, &slot.data)?;
                slot.dirty = false;
            }
        }
        Ok(())
    }

    fn access_slot(&self, sector: SectorId, for_write: bool) -> Result<spin::MutexGuard<'_, Slot>> {
        for slot_lock in self.slots.iter() {
            let mut slot = slot_lock.lock();
            if slot.alloc && slot.sector == sector {
                trace!("bio: hit sector {sector}");
                if for_write {
                    slot.dirty = true;
                } else {
                    slot.access = true;
                }
                return Ok(slot);
            }
        }
        self.evict_and_fill(sector, for_write)
    }

    fn evict_and_fill(&self, sector: SectorId, for_write: bool) -> Result<spin::MutexGuard<'_, Slot>> {
        let mut clock = self.eviction.lock();
        loop {
            let idx = clock.hand;
            clock.hand = (idx + 1) % N;
            let mut slot = self.slots[idx].lock();

            if !slot.alloc {
                trace!("bio: fault sector {sector} into free slot {idx}");
                self.device.read(sector, &mut slot.data)?;
                slot.sector = sector;
                slot.alloc = true;
                slot.access = false;
                slot.dirty = for_write;
                return Ok(slot);
            }

            if !slot.access {
                if slot.dirty {
                    trace!("bio: evict dirty sector {} from slot {idx}", slot.sector);
                    self.device.write(slot.sector, &slot.data)?;
                }
                self.device.read(sector, &mut slot.data)?;
                slot.sector = sector;
                slot.access = false;
                slot.dirty = for_write;
                return Ok(slot);
            }

            slot.access = false;
        }
    }
}
