//! Tagged buddy allocator over a simulated address space
//!
//! Implements reservation by first-fit splitting and release with
//! recursive buddy coalescing on top of the block arena.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::{level_of, SimError, SimResult, TaggedAllocator};

#[cfg(feature = "log")]
use log::{debug, info, warn};

use super::{
    block::{Block, BlockId, BlockInfo},
    block_pool::{BlockPool, BlockPoolStats},
    free_list::FreeList,
    stats::{BuddyStats, MemoryStatsReporter},
};

/// A live reservation
#[derive(Debug, Clone, Copy)]
struct Reservation {
    block: BlockId,
    /// Units asked for before rounding up
    requested: usize,
}

/// Buddy allocator owning one block tree
///
/// Every block lives in `pool`; `free_lists[level]` lists the free leaves of
/// size `2^level` and `allocated` maps each tag to the leaf it occupies.
#[derive(Debug, Clone)]
pub struct BuddyAllocator {
    total_size: usize,
    root: BlockId,
    pool: BlockPool,
    /// Free lists for each level
    free_lists: Vec<FreeList>,
    allocated: BTreeMap<String, Reservation>,
    #[cfg(feature = "tracking")]
    total_reservations: usize,
    #[cfg(feature = "tracking")]
    total_releases: usize,
}

impl BuddyAllocator {
    /// Create an allocator managing `capacity` units, rounded up to a power of two
    pub fn new(capacity: usize) -> SimResult<Self> {
        if capacity == 0 {
            warn!("buddy: rejecting zero capacity");
            return Err(SimError::InvalidCapacity);
        }
        let total_size = capacity
            .checked_next_power_of_two()
            .ok_or(SimError::InvalidCapacity)?;
        let level_count = level_of(total_size) + 1;

        let mut pool = BlockPool::new();
        let root = pool.insert(Block::new(total_size, 0));

        let mut allocator = Self {
            total_size,
            root,
            pool,
            free_lists: (0..level_count).map(|_| FreeList::new()).collect(),
            allocated: BTreeMap::new(),
            #[cfg(feature = "tracking")]
            total_reservations: 0,
            #[cfg(feature = "tracking")]
            total_releases: 0,
        };
        allocator.push_free(root);

        info!(
            "buddy: initialized with {} units ({} levels, requested {})",
            total_size, level_count, capacity
        );
        Ok(allocator)
    }

    /// Add a block to the list for its level
    fn push_free(&mut self, id: BlockId) {
        let level = self.pool[id].level();
        match self.free_lists.get_mut(level) {
            Some(list) => {
                list.push_back(id);
            }
            None => {
                warn!(
                    "buddy: level {} exceeds level count {}, block not listed",
                    level,
                    self.free_lists.len()
                );
            }
        }
    }

    /// Remove a block from the list for its level
    fn remove_free(&mut self, id: BlockId) {
        let level = self.pool[id].level();
        match self.free_lists.get_mut(level) {
            Some(list) => {
                list.remove(id);
            }
            None => {
                warn!(
                    "buddy: level {} exceeds level count {}, nothing to remove",
                    level,
                    self.free_lists.len()
                );
            }
        }
    }

    /// Pop the first block of the first non-empty list at or above `level`
    fn take_first_free(&mut self, level: usize) -> Option<BlockId> {
        self.free_lists
            .iter_mut()
            .skip(level)
            .find_map(|list| list.pop_front())
    }

    /// Reserve `requested` units under `tag`
    ///
    /// The request is rounded up to a power of two. The smallest non-empty
    /// free list that fits is used and its first block is split down to size,
    /// each right half going back on its free list.
    pub fn reserve(&mut self, requested: usize, tag: &str) -> SimResult<BlockInfo> {
        if requested == 0 {
            return Err(SimError::InvalidSize);
        }
        if self.allocated.contains_key(tag) {
            debug!("buddy: tag '{}' already reserved", tag);
            return Err(SimError::DuplicateTag);
        }

        let actual = match requested.checked_next_power_of_two() {
            Some(size) if size <= self.total_size => size,
            _ => {
                MemoryStatsReporter::log_reserve_failure(&self.stats(), requested, tag);
                return Err(SimError::OutOfMemory);
            }
        };
        let target_level = level_of(actual);

        let mut id = match self.take_first_free(target_level) {
            Some(id) => id,
            None => {
                MemoryStatsReporter::log_reserve_failure(&self.stats(), requested, tag);
                return Err(SimError::OutOfMemory);
            }
        };

        // Listed blocks are free leaves and `actual >= 1`, so every split
        // below succeeds
        debug_assert!(self.pool[id].free && self.pool[id].is_leaf());
        while self.pool[id].size > actual {
            let Some((left, right)) = self.pool.split(id) else {
                warn!(
                    "buddy: failed to split block {:?} of size {}",
                    id, self.pool[id].size
                );
                // Merge the halves pushed so far back into the taken block
                self.push_free(id);
                self.coalesce(id);
                return Err(SimError::OutOfMemory);
            };
            self.push_free(right);
            id = left;
        }

        let block = &mut self.pool[id];
        block.free = false;
        block.tag = Some(String::from(tag));
        let info = BlockInfo {
            address: block.address,
            size: block.size,
            tag: String::from(tag),
        };
        self.allocated.insert(
            String::from(tag),
            Reservation {
                block: id,
                requested,
            },
        );
        #[cfg(feature = "tracking")]
        {
            self.total_reservations += 1;
        }

        debug!(
            "buddy: reserved [{:#x}, {:#x}) for '{}' ({} units requested)",
            info.address,
            info.address + info.size,
            tag,
            requested
        );
        Ok(info)
    }

    /// Release the block held by `tag` and coalesce upward
    pub fn free(&mut self, tag: &str) -> SimResult {
        let reservation = match self.allocated.remove(tag) {
            Some(reservation) => reservation,
            None => {
                debug!("buddy: free of unknown tag '{}'", tag);
                return Err(SimError::NotFound);
            }
        };
        let id = reservation.block;

        let block = &mut self.pool[id];
        block.free = true;
        block.tag = None;
        debug!(
            "buddy: released [{:#x}, {:#x}) held by '{}'",
            block.address,
            block.end(),
            tag
        );

        self.push_free(id);
        self.coalesce(id);
        #[cfg(feature = "tracking")]
        {
            self.total_releases += 1;
        }
        Ok(())
    }

    /// Merge a free block with its buddy, repeating on the parent
    fn coalesce(&mut self, id: BlockId) {
        let buddy = match self.pool.buddy_of(id) {
            Some(buddy) => buddy,
            None => return,
        };
        if !self.pool[buddy].free {
            return;
        }

        // Merge is always invoked on the lower-addressed half
        let (left, right) = if self.pool[id].address < self.pool[buddy].address {
            (id, buddy)
        } else {
            (buddy, id)
        };

        self.remove_free(left);
        self.remove_free(right);

        match self.pool.merge(left, right) {
            Some(parent) => {
                debug!(
                    "buddy: coalesced into [{:#x}, {:#x})",
                    self.pool[parent].address,
                    self.pool[parent].end()
                );
                self.push_free(parent);
                self.coalesce(parent);
            }
            None => {
                warn!("buddy: merge of {:?} and {:?} refused", left, right);
                self.push_free(left);
                self.push_free(right);
            }
        }
    }

    /// Total managed units (a power of two)
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Number of free-list levels
    pub fn level_count(&self) -> usize {
        self.free_lists.len()
    }

    pub fn root(&self) -> BlockId {
        self.root
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.pool.get(id)
    }

    /// The other half of the split that produced `id`
    pub fn buddy_of(&self, id: BlockId) -> Option<BlockId> {
        self.pool.buddy_of(id)
    }

    /// Block currently held by `tag`
    pub fn lookup(&self, tag: &str) -> Option<BlockInfo> {
        let reservation = self.allocated.get(tag)?;
        let block = &self.pool[reservation.block];
        Some(BlockInfo {
            address: block.address,
            size: block.size,
            tag: String::from(tag),
        })
    }

    pub fn is_reserved(&self, tag: &str) -> bool {
        self.allocated.contains_key(tag)
    }

    /// Live reservations ordered by tag
    pub fn allocations(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        self.allocated.iter().map(move |(tag, reservation)| {
            let block = &self.pool[reservation.block];
            BlockInfo {
                address: block.address,
                size: block.size,
                tag: tag.clone(),
            }
        })
    }

    /// Free blocks of a level, in list order
    pub fn free_blocks(&self, level: usize) -> impl Iterator<Item = &Block> + '_ {
        self.free_lists
            .get(level)
            .into_iter()
            .flat_map(|list| list.iter())
            .map(move |id| &self.pool[id])
    }

    /// Free list of a level, if the level exists
    pub fn free_list(&self, level: usize) -> Option<&FreeList> {
        self.free_lists.get(level)
    }

    /// Get the number of blocks in a specific level
    pub fn free_block_count(&self, level: usize) -> usize {
        self.free_lists.get(level).map_or(0, FreeList::len)
    }

    /// Units sitting in free lists
    pub fn free_units(&self) -> usize {
        self.free_lists
            .iter()
            .enumerate()
            .map(|(level, list)| list.len() << level)
            .sum()
    }

    /// Units covered by live reservations (after rounding)
    pub fn used_units(&self) -> usize {
        self.allocated
            .values()
            .map(|reservation| self.pool[reservation.block].size)
            .sum()
    }

    /// Size of the largest block a single reservation could get
    pub fn largest_free_block(&self) -> Option<usize> {
        self.free_lists
            .iter()
            .rposition(|list| !list.is_empty())
            .map(|level| 1 << level)
    }

    /// Get block arena statistics
    pub fn pool_stats(&self) -> BlockPoolStats {
        self.pool.get_stats()
    }

    /// Get statistics for this allocator
    pub fn stats(&self) -> BuddyStats {
        let free_blocks_by_level: Vec<usize> =
            self.free_lists.iter().map(FreeList::len).collect();

        BuddyStats {
            total_units: self.total_size,
            free_units: self.free_units(),
            used_units: self.used_units(),
            requested_units: self.allocated.values().map(|r| r.requested).sum(),
            allocations: self.allocated.len(),
            largest_free_block: self.largest_free_block(),
            free_blocks_by_level,
            #[cfg(feature = "tracking")]
            total_reservations: self.total_reservations,
            #[cfg(feature = "tracking")]
            total_releases: self.total_releases,
        }
    }
}

impl TaggedAllocator for BuddyAllocator {
    fn reserve(&mut self, units: usize, tag: &str) -> SimResult<BlockInfo> {
        BuddyAllocator::reserve(self, units, tag)
    }

    fn free(&mut self, tag: &str) -> SimResult {
        BuddyAllocator::free(self, tag)
    }

    fn total_units(&self) -> usize {
        self.total_size
    }

    fn used_units(&self) -> usize {
        BuddyAllocator::used_units(self)
    }

    fn available_units(&self) -> usize {
        self.free_units()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn leaf_units(allocator: &BuddyAllocator) -> usize {
        allocator.free_units() + allocator.used_units()
    }

    #[test]
    fn test_capacity_rounding() {
        assert_eq!(BuddyAllocator::new(10).unwrap().total_size(), 16);
        assert_eq!(BuddyAllocator::new(16).unwrap().total_size(), 16);
        assert_eq!(BuddyAllocator::new(1).unwrap().total_size(), 1);
        assert_eq!(BuddyAllocator::new(17).unwrap().total_size(), 32);
    }

    #[test]
    fn test_invalid_capacity() {
        assert_eq!(BuddyAllocator::new(0).unwrap_err(), SimError::InvalidCapacity);
        assert_eq!(
            BuddyAllocator::new(usize::MAX).unwrap_err(),
            SimError::InvalidCapacity
        );
    }

    #[test]
    fn test_initial_free_list() {
        let allocator = BuddyAllocator::new(16).unwrap();
        assert_eq!(allocator.level_count(), 5);
        assert_eq!(allocator.free_block_count(4), 1);

        let root = allocator.free_blocks(4).next().unwrap();
        assert_eq!(root.size, 16);
        assert_eq!(root.address, 0);
        for level in 0..4 {
            assert_eq!(allocator.free_block_count(level), 0);
        }
    }

    #[test]
    fn test_reserve_splits_down() {
        let mut allocator = BuddyAllocator::new(32).unwrap();

        let a = allocator.reserve(5, "procA").unwrap();
        assert_eq!(a.size, 8);
        assert_eq!(a.address, 0);

        // Right halves of each split stay available
        assert_eq!(allocator.free_block_count(4), 1);
        assert_eq!(allocator.free_block_count(3), 1);
        assert_eq!(allocator.free_blocks(3).next().unwrap().address, 8);

        let b = allocator.reserve(1, "procB").unwrap();
        assert_eq!(b.size, 1);
        assert_eq!(b.address, 8);
        assert_eq!(leaf_units(&allocator), 32);
    }

    #[test]
    fn test_reserve_uses_smallest_sufficient_level() {
        let mut allocator = BuddyAllocator::new(16).unwrap();
        allocator.reserve(1, "a").unwrap();
        // Levels 0..=3 each hold one free block now
        let b = allocator.reserve(2, "b").unwrap();
        assert_eq!(b.address, 2);
        assert_eq!(b.size, 2);
        assert_eq!(allocator.free_block_count(3), 1);
    }

    #[test]
    fn test_reserve_invalid_size() {
        let mut allocator = BuddyAllocator::new(8).unwrap();
        assert_eq!(allocator.reserve(0, "x"), Err(SimError::InvalidSize));
        assert!(!allocator.is_reserved("x"));
    }

    #[test]
    fn test_duplicate_tag() {
        let mut allocator = BuddyAllocator::new(16).unwrap();
        allocator.reserve(2, "a").unwrap();
        assert_eq!(allocator.reserve(2, "a"), Err(SimError::DuplicateTag));

        allocator.free("a").unwrap();
        assert!(allocator.reserve(2, "a").is_ok());
    }

    #[test]
    fn test_exhaustion() {
        let mut allocator = BuddyAllocator::new(16).unwrap();
        allocator.reserve(10, "p1").unwrap();
        assert_eq!(allocator.free_units(), 0);
        assert_eq!(allocator.reserve(8, "p2"), Err(SimError::OutOfMemory));
        assert_eq!(allocator.reserve(2, "p2"), Err(SimError::OutOfMemory));
        assert_eq!(allocator.reserve(100, "p3"), Err(SimError::OutOfMemory));
        assert_eq!(
            allocator.reserve(usize::MAX, "p4"),
            Err(SimError::OutOfMemory)
        );
    }

    #[test]
    fn test_fill_every_level() {
        let mut allocator = BuddyAllocator::new(32).unwrap();
        for (units, tag) in [(16, "f16"), (8, "f8"), (4, "f4"), (2, "f2"), (1, "f1")] {
            allocator.reserve(units, tag).unwrap();
        }
        assert_eq!(allocator.free_units(), 1);
        allocator.reserve(1, "last").unwrap();
        assert_eq!(allocator.reserve(1, "fail"), Err(SimError::OutOfMemory));
    }

    #[test]
    fn test_free_unknown_tag() {
        let mut allocator = BuddyAllocator::new(8).unwrap();
        assert_eq!(allocator.free("ghost"), Err(SimError::NotFound));
    }

    #[test]
    fn test_free_coalesces_to_root() {
        let mut allocator = BuddyAllocator::new(8).unwrap();
        allocator.reserve(1, "p1").unwrap();
        allocator.reserve(1, "p2").unwrap();
        allocator.reserve(2, "p3").unwrap();

        allocator.free("p1").unwrap();
        // Buddy p2 still held, so no merge yet
        assert_eq!(allocator.free_block_count(0), 1);

        allocator.free("p2").unwrap();
        assert_eq!(allocator.free_block_count(0), 0);
        assert_eq!(allocator.free_block_count(1), 1);

        allocator.free("p3").unwrap();
        assert_eq!(allocator.free_block_count(3), 1);
        assert_eq!(allocator.pool_stats().live_blocks, 1);

        let whole = allocator.reserve(8, "final").unwrap();
        assert_eq!(whole.address, 0);
        assert_eq!(whole.size, 8);
    }

    #[test]
    fn test_coalesce_stops_at_busy_buddy() {
        let mut allocator = BuddyAllocator::new(16).unwrap();
        allocator.reserve(4, "a").unwrap();
        allocator.reserve(4, "b").unwrap();
        allocator.reserve(8, "c").unwrap();

        allocator.free("b").unwrap();
        assert_eq!(allocator.free_block_count(2), 1);
        assert_eq!(allocator.largest_free_block(), Some(4));

        allocator.free("a").unwrap();
        assert_eq!(allocator.free_block_count(2), 0);
        assert_eq!(allocator.free_block_count(3), 1);
        assert_eq!(allocator.largest_free_block(), Some(8));
    }

    #[test]
    fn test_buddy_identification() {
        let mut allocator = BuddyAllocator::new(4).unwrap();
        let root = allocator.root();
        assert_eq!(allocator.buddy_of(root), None);

        allocator.reserve(2, "l").unwrap();
        let left = allocator.block(root).unwrap().left.unwrap();
        let right = allocator.block(root).unwrap().right.unwrap();
        assert_eq!(allocator.buddy_of(left), Some(right));
        assert_eq!(allocator.buddy_of(right), Some(left));
    }

    #[test]
    fn test_single_unit_allocator() {
        let mut allocator = BuddyAllocator::new(1).unwrap();
        assert_eq!(allocator.level_count(), 1);
        let info = allocator.reserve(1, "only").unwrap();
        assert_eq!((info.address, info.size), (0, 1));
        assert_eq!(allocator.reserve(1, "more"), Err(SimError::OutOfMemory));
        allocator.free("only").unwrap();
        assert_eq!(allocator.free_block_count(0), 1);
    }

    #[test]
    fn test_allocations_in_tag_order() {
        let mut allocator = BuddyAllocator::new(16).unwrap();
        allocator.reserve(4, "zeta").unwrap();
        allocator.reserve(2, "alpha").unwrap();

        let tags: Vec<String> = allocator.allocations().map(|info| info.tag).collect();
        assert_eq!(tags, vec![String::from("alpha"), String::from("zeta")]);
        assert_eq!(allocator.lookup("zeta").unwrap().size, 4);
        assert!(allocator.lookup("beta").is_none());
    }

    #[test]
    fn test_stats_fragmentation() {
        let mut allocator = BuddyAllocator::new(16).unwrap();
        allocator.reserve(3, "app1").unwrap();
        allocator.reserve(5, "app2").unwrap();

        let stats = allocator.stats();
        assert_eq!(stats.total_units, 16);
        assert_eq!(stats.used_units, 12);
        assert_eq!(stats.requested_units, 8);
        assert_eq!(stats.free_units, 4);
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.internal_fragmentation(), 4);
        assert_eq!(stats.free_blocks_by_level, vec![0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_split_chain_leaves_one_free_half_per_level() {
        let mut allocator = BuddyAllocator::new(64).unwrap();
        let info = allocator.reserve(1, "tiny").unwrap();
        assert_eq!((info.address, info.size), (0, 1));

        for level in 0..6 {
            let halves: Vec<(usize, usize)> = allocator
                .free_blocks(level)
                .map(|block| (block.address, block.size))
                .collect();
            assert_eq!(halves, vec![(1 << level, 1 << level)]);
        }
        assert_eq!(allocator.free_block_count(6), 0);
        assert_eq!(leaf_units(&allocator), 64);

        allocator.free("tiny").unwrap();
        assert_eq!(allocator.free_block_count(6), 1);
        assert_eq!(allocator.pool_stats().live_blocks, 1);
    }

    #[cfg(feature = "tracking")]
    #[test]
    fn test_tracking_counts_only_successful_calls() {
        let mut allocator = BuddyAllocator::new(8).unwrap();
        allocator.reserve(1, "x").unwrap();
        assert_eq!(allocator.reserve(1, "x"), Err(SimError::DuplicateTag));
        assert_eq!(allocator.reserve(16, "big"), Err(SimError::OutOfMemory));
        assert_eq!(allocator.reserve(0, "zero"), Err(SimError::InvalidSize));

        let stats = allocator.stats();
        assert_eq!(stats.total_reservations, 1);
        assert_eq!(stats.total_releases, 0);

        allocator.free("x").unwrap();
        assert_eq!(allocator.free("x"), Err(SimError::NotFound));

        let stats = allocator.stats();
        assert_eq!(stats.total_reservations, 1);
        assert_eq!(stats.total_releases, 1);

        // Counters are running totals, not live counts
        allocator.reserve(2, "y").unwrap();
        allocator.free("y").unwrap();
        let stats = allocator.stats();
        assert_eq!(stats.total_reservations, 2);
        assert_eq!(stats.total_releases, 2);
        assert_eq!(stats.allocations, 0);
    }

    #[test]
    fn test_trait_object_usage() {
        let mut allocator = BuddyAllocator::new(8).unwrap();
        let tagged: &mut dyn TaggedAllocator = &mut allocator;
        tagged.reserve(3, "t").unwrap();
        assert_eq!(tagged.total_units(), 8);
        assert_eq!(tagged.used_units(), 4);
        assert_eq!(tagged.available_units(), 4);
        tagged.free("t").unwrap();
        assert_eq!(tagged.available_units(), 8);
    }
}
