//! Block arena for the buddy tree
//!
//! All blocks of one allocator live in a single pool and refer to each other
//! by [`BlockId`]. Slots released by a merge are chained into a vacant list
//! and handed out again by the next split, so ids stay small and stable.

use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

#[cfg(feature = "log")]
use log::trace;

use super::block::{Block, BlockId};
use crate::is_aligned;

#[derive(Debug, Clone)]
enum Slot {
    Occupied(Block),
    Vacant { next: Option<usize> },
}

/// Arena owning every block of a buddy tree
#[derive(Debug, Clone, Default)]
pub struct BlockPool {
    slots: Vec<Slot>,
    /// Head of the vacant slot chain
    vacant_head: Option<usize>,
    live_blocks: usize,
    /// Allocation statistics
    total_allocations: usize,
    total_releases: usize,
}

impl BlockPool {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant_head: None,
            live_blocks: 0,
            total_allocations: 0,
            total_releases: 0,
        }
    }

    /// Place a block into the pool, reusing a vacant slot when one exists
    pub fn insert(&mut self, block: Block) -> BlockId {
        self.total_allocations += 1;
        self.live_blocks += 1;

        if let Some(idx) = self.vacant_head {
            if let Slot::Vacant { next } = self.slots[idx] {
                self.vacant_head = next;
            }
            self.slots[idx] = Slot::Occupied(block);
            return BlockId(idx);
        }

        self.slots.push(Slot::Occupied(block));
        BlockId(self.slots.len() - 1)
    }

    /// Return a block's slot to the vacant chain
    ///
    /// Returns the removed block, or `None` if the id was not live.
    pub fn release(&mut self, id: BlockId) -> Option<Block> {
        let slot = self.slots.get_mut(id.0)?;
        if !matches!(slot, Slot::Occupied(_)) {
            return None;
        }

        let old = core::mem::replace(
            slot,
            Slot::Vacant {
                next: self.vacant_head,
            },
        );
        self.vacant_head = Some(id.0);
        self.live_blocks -= 1;
        self.total_releases += 1;

        match old {
            Slot::Occupied(block) => Some(block),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        match self.slots.get(id.0) {
            Some(Slot::Occupied(block)) => Some(block),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        match self.slots.get_mut(id.0) {
            Some(Slot::Occupied(block)) => Some(block),
            _ => None,
        }
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.get(id).is_some()
    }

    /// Split a leaf into two half-size children
    ///
    /// The block stops being individually allocatable. Returns `None` when the
    /// block is already the minimum unit, already has children, or is unknown.
    pub fn split(&mut self, id: BlockId) -> Option<(BlockId, BlockId)> {
        let (size, address) = match self.get(id) {
            Some(block) if block.size > 1 && block.is_leaf() => (block.size, block.address),
            _ => return None,
        };

        let half = size / 2;
        debug_assert!(is_aligned(address, size));

        let mut left = Block::new(half, address);
        left.parent = Some(id);
        let mut right = Block::new(half, address + half);
        right.parent = Some(id);

        let left = self.insert(left);
        let right = self.insert(right);

        let block = &mut self[id];
        block.free = false;
        block.left = Some(left);
        block.right = Some(right);

        trace!(
            "block pool: split [{:#x}, {:#x}) into {:?} and {:?}",
            address,
            address + size,
            left,
            right
        );
        Some((left, right))
    }

    /// Merge a free left child with its free right buddy
    ///
    /// Only `left.merge(right)` is legal. On success both children are released
    /// and the now-free parent is returned; otherwise nothing changes.
    pub fn merge(&mut self, id: BlockId, buddy: BlockId) -> Option<BlockId> {
        let block = self.get(id)?;
        let other = self.get(buddy)?;
        let parent_id = block.parent?;
        if !block.free || !other.free {
            return None;
        }

        let parent = self.get(parent_id)?;
        if parent.left != Some(id) || parent.right != Some(buddy) {
            return None;
        }

        self.release(id);
        self.release(buddy);

        let parent = &mut self[parent_id];
        parent.left = None;
        parent.right = None;
        parent.free = true;

        trace!(
            "block pool: merged {:?} and {:?} into {:?}",
            id,
            buddy,
            parent_id
        );
        Some(parent_id)
    }

    /// The other child of this block's parent; `None` for the root
    pub fn buddy_of(&self, id: BlockId) -> Option<BlockId> {
        let parent = self.get(self.get(id)?.parent?)?;
        if parent.left == Some(id) {
            parent.right
        } else if parent.right == Some(id) {
            parent.left
        } else {
            None
        }
    }

    /// Number of live blocks
    pub fn len(&self) -> usize {
        self.live_blocks
    }

    pub fn is_empty(&self) -> bool {
        self.live_blocks == 0
    }

    /// Get pool statistics
    pub fn get_stats(&self) -> BlockPoolStats {
        BlockPoolStats {
            live_blocks: self.live_blocks,
            vacant_slots: self.slots.len() - self.live_blocks,
            total_allocations: self.total_allocations,
            total_releases: self.total_releases,
        }
    }
}

impl Index<BlockId> for BlockPool {
    type Output = Block;

    fn index(&self, id: BlockId) -> &Block {
        match self.get(id) {
            Some(block) => block,
            None => panic!("stale block id {:?}", id),
        }
    }
}

impl IndexMut<BlockId> for BlockPool {
    fn index_mut(&mut self, id: BlockId) -> &mut Block {
        match self.get_mut(id) {
            Some(block) => block,
            None => panic!("stale block id {:?}", id),
        }
    }
}

/// Block pool statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockPoolStats {
    pub live_blocks: usize,
    pub vacant_slots: usize,
    pub total_allocations: usize,
    pub total_releases: usize,
}
