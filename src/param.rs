//! Fixed sizes and constants for the storage core.

/// Size in bytes of a single on-disk sector.
pub const SECTOR_SIZE: usize = 512;

/// Number of slots in the sector buffer cache.
pub const NBUF: usize = 64;

/// Maximum number of simultaneously open inodes.
pub const NINODE: usize = 50;

/// Magic value stamped into every on-disk inode header, checked on decode.
pub const INODE_MAGIC: u32 = 0x494e4f44;
