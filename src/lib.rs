//! Buddy System Simulator
//!
//! This crate simulates a binary buddy allocator over an abstract address space,
//! featuring:
//! - Arena-backed block tree with split and merge
//! - Per-level free lists with first-fit reservation
//! - Tagged reservations with recursive coalescing on release
//! - Tree inspection and statistics
//! - A command shell adapter for interactive front ends
//!
//! Only block metadata is tracked; no payload bytes are ever stored.

#![no_std]

extern crate alloc;

use core::fmt;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// The error type used by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// The allocator was constructed with a zero (or unrepresentable) capacity.
    InvalidCapacity,
    /// A reservation asked for zero units.
    InvalidSize,
    /// The tag is already held by a live reservation.
    DuplicateTag,
    /// No free block of sufficient size exists, even after splitting.
    OutOfMemory,
    /// Release of a tag that is not currently reserved.
    NotFound,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SimError::InvalidCapacity => "total capacity must be positive",
            SimError::InvalidSize => "requested size must be positive",
            SimError::DuplicateTag => "a block with that name already exists",
            SimError::OutOfMemory => "not enough memory available for the request",
            SimError::NotFound => "no block with that name exists",
        };
        f.write_str(msg)
    }
}

/// A [`Result`] type with [`SimError`] as the error type.
pub type SimResult<T = ()> = Result<T, SimError>;

/// Allocators that hand out named regions of a simulated address space.
pub trait TaggedAllocator {
    /// Reserve at least `units` units under the given `tag`.
    fn reserve(&mut self, units: usize, tag: &str) -> SimResult<BlockInfo>;

    /// Release the region held by `tag`.
    fn free(&mut self, tag: &str) -> SimResult;

    /// Returns the total number of units managed.
    fn total_units(&self) -> usize;

    /// Returns the number of units held by live reservations.
    fn used_units(&self) -> usize;

    /// Returns the number of units sitting in free lists.
    fn available_units(&self) -> usize;
}

/// Level (log2) of a power-of-two size.
#[inline]
pub(crate) const fn level_of(size: usize) -> usize {
    size.trailing_zeros() as usize
}

/// Checks whether `addr` is a multiple of the power-of-two `size`.
#[inline]
pub(crate) const fn is_aligned(addr: usize, size: usize) -> bool {
    addr & (size - 1) == 0
}

pub mod buddy;
pub use buddy::{
    BlockId, BlockInfo, BlockState, BlockView, BuddyAllocator, BuddyStats, TreeView,
};

pub mod locked;
pub use locked::LockedBuddy;

pub mod shell;
pub use shell::{parse_capacity, Command, Shell, ShellError, ShellOutput};
