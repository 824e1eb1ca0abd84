//! Error types surfaced by the storage core to its callers.
//!
//! Programming errors (violated invariants, misuse of the API) stay as
//! `assert!`/`debug_assert!` panics, matching the rest of the tree. These
//! types are only for the recoverable failure classes: resource exhaustion
//! and collaborator failures.

use thiserror::Error;

/// Failure reported by a [`crate::hal::BlockDevice`] collaborator.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("sector {0} is out of range for the backing device")]
    OutOfRange(u32),
    #[error("I/O failure reading or writing a sector")]
    Io,
}

/// Failures recognized by the storage core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no free slot or handle available to satisfy the request")]
    OutOfMemory,
    #[error("the free-sector allocator has no extent of the requested size")]
    OutOfDiskSpace,
    #[error("the virtual address is already bound to a page")]
    AlreadyMapped,
    #[error(transparent)]
    Disk(#[from] DiskError),
}

pub type Result<T> = core::result::Result<T, CoreError>;
