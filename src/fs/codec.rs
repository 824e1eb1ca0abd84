//! On-disk inode header layout.
//!
//! Each inode occupies exactly one sector: a little-endian `start` sector,
//! a little-endian `length` in bytes, a magic tag, and zero padding out to
//! the sector size. Encoded/decoded by hand (not via a zerocopy cast) so the
//! wire format is little-endian regardless of host byte order.

use static_assertions::const_assert;

use crate::hal::SectorId;
use crate::param::{INODE_MAGIC, SECTOR_SIZE};

const_assert!(4 + 4 + 4 <= SECTOR_SIZE);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskInode {
    pub start: SectorId,
    pub length: i32,
    pub magic: u32,
}

impl DiskInode {
    pub fn new(start: SectorId, length: i32) -> Self {
        Self { start, length, magic: INODE_MAGIC }
    }

    pub fn encode(&self) -> [u8; SECTOR_SIZE] {
        let mut buf = [0u8; SECTOR_SIZE];
        buf[0..4].copy_from_slice(&self.start.to_le_bytes());
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf[8..12].copy_from_slice(&self.magic.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; SECTOR_SIZE]) -> Self {
        let start = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let length = i32::from_le_bytes(buf[4..8].try_into().unwrap());
        let magic = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        assert_eq!(magic, INODE_MAGIC, "corrupt on-disk inode header: bad magic");
        Self { start, length, magic }
    }
}
