//! Per-level free list of block ids
//!
//! Keeps insertion order so reservation is first-fit within a level.
//! Removal is by block identity: two blocks of equal size are never
//! interchangeable.

use alloc::vec::Vec;

use super::block::BlockId;

/// Ordered sequence of free blocks sharing one level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeList {
    ids: Vec<BlockId>,
}

impl FreeList {
    /// Create a new empty free list
    pub const fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Append a block at the tail
    ///
    /// Returns `false` if the block is already listed.
    pub fn push_back(&mut self, id: BlockId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// First block in list order, without removing it
    pub fn front(&self) -> Option<BlockId> {
        self.ids.first().copied()
    }

    /// Remove and return the first block
    pub fn pop_front(&mut self) -> Option<BlockId> {
        if self.ids.is_empty() {
            None
        } else {
            Some(self.ids.remove(0))
        }
    }

    /// Remove this exact block; linear scan
    pub fn remove(&mut self, id: BlockId) -> bool {
        match self.ids.iter().position(|&listed| listed == id) {
            Some(pos) => {
                self.ids.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Get iterator over block ids in list order
    pub fn iter(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.ids.iter().copied()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
