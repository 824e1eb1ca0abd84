//! Inode layer built on top of the sector buffer cache.

pub mod codec;
pub mod inode;

pub use inode::{Inode, InodeTable};
