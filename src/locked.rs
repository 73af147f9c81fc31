//! Lock-protected shared allocator
//!
//! The block tree, free lists and tag index form one mutable resource, so a
//! single lock guards all of them. Every operation, including a full
//! coalescing cascade, completes under one lock acquisition.

use spin::Mutex;

use crate::buddy::{BlockInfo, BuddyAllocator, BuddyStats};
use crate::{SimResult, TaggedAllocator};

/// A thread-safe wrapper around the [`BuddyAllocator`]
pub struct LockedBuddy {
    pub allocator: Mutex<BuddyAllocator>,
}

impl LockedBuddy {
    /// Create a shared allocator of at least `capacity` units
    pub fn new(capacity: usize) -> SimResult<Self> {
        Ok(Self::from_allocator(BuddyAllocator::new(capacity)?))
    }

    pub const fn from_allocator(allocator: BuddyAllocator) -> Self {
        Self {
            allocator: Mutex::new(allocator),
        }
    }

    pub fn reserve(&self, units: usize, tag: &str) -> SimResult<BlockInfo> {
        self.allocator.lock().reserve(units, tag)
    }

    pub fn free(&self, tag: &str) -> SimResult {
        self.allocator.lock().free(tag)
    }

    pub fn stats(&self) -> BuddyStats {
        self.allocator.lock().stats()
    }

    /// Run `f` with exclusive access to the allocator
    pub fn with<R>(&self, f: impl FnOnce(&mut BuddyAllocator) -> R) -> R {
        f(&mut self.allocator.lock())
    }

    pub fn into_inner(self) -> BuddyAllocator {
        self.allocator.into_inner()
    }
}

impl TaggedAllocator for LockedBuddy {
    fn reserve(&mut self, units: usize, tag: &str) -> SimResult<BlockInfo> {
        self.allocator.get_mut().reserve(units, tag)
    }

    fn free(&mut self, tag: &str) -> SimResult {
        self.allocator.get_mut().free(tag)
    }

    fn total_units(&self) -> usize {
        self.allocator.lock().total_size()
    }

    fn used_units(&self) -> usize {
        self.allocator.lock().used_units()
    }

    fn available_units(&self) -> usize {
        self.allocator.lock().free_units()
    }
}
