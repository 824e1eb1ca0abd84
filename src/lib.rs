//! Storage core of a small teaching operating system.
//!
//! Three layers, each generic over an external collaborator (see `hal`):
//!   + `bio`: a sector buffer cache with clock eviction over a raw block
//!     device.
//!   + `fs`: an inode layer built on top of the buffer cache, tracking
//!     open inodes by on-disk sector with reference counting and deferred
//!     deletion.
//!   + `frame`: a frame table mapping physical frames to the page-table
//!     entries that reference them, backed by a frame allocator and page
//!     table.

pub mod bio;
pub mod error;
pub mod frame;
pub mod hal;
pub mod param;

pub mod fs;

#[cfg(test)]
mod testutil;

pub use error::{CoreError, DiskError, Result};
