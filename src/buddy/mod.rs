//! Buddy allocator module
//!
//! This module provides the buddy system simulation with:
//! - An index-addressed block arena holding the address-space tree
//! - Per-level free lists with identity-based removal
//! - Tagged reservation, release and recursive coalescing
//! - Tree inspection and statistics

pub mod block;
pub mod block_pool;
pub mod buddy_allocator;
pub mod free_list;
pub mod render;
pub mod stats;

pub use block::{Block, BlockId, BlockInfo, BlockState};
pub use block_pool::{BlockPool, BlockPoolStats};
pub use buddy_allocator::BuddyAllocator;
pub use free_list::FreeList;
pub use render::{BlockView, TreeView};
pub use stats::{BuddyStats, MemoryStatsReporter};
