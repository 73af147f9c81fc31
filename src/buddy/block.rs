//! Buddy block metadata
//!
//! Represents one segment of the simulated address space. Blocks form a
//! binary tree whose links are arena indices rather than pointers.

use alloc::string::String;
use core::fmt;

use crate::level_of;

/// Stable handle of a block inside a [`BlockPool`](super::BlockPool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Raw slot index in the arena
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One node of the address-space tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub size: usize,
    pub address: usize,
    pub free: bool,
    pub tag: Option<String>,
    pub parent: Option<BlockId>,
    pub left: Option<BlockId>,
    pub right: Option<BlockId>,
}

impl Block {
    /// Create a free, unlinked block
    pub const fn new(size: usize, address: usize) -> Self {
        Self {
            size,
            address,
            free: true,
            tag: None,
            parent: None,
            left: None,
            right: None,
        }
    }

    /// Free-list level of this block, i.e. log2(size)
    pub fn level(&self) -> usize {
        level_of(self.size)
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// End address (exclusive)
    pub fn end(&self) -> usize {
        self.address + self.size
    }

    /// Derived status of this block
    pub fn state(&self) -> BlockState<'_> {
        if self.free {
            BlockState::Free
        } else if let Some(tag) = self.tag.as_deref() {
            BlockState::Allocated(tag)
        } else {
            BlockState::Split
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Addr: {}, Size: {}, {}",
            self.address,
            self.size,
            self.state()
        )
    }
}

/// Status of a block as seen from the outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState<'a> {
    /// Childless and sitting in a free list
    Free,
    /// Internal node; its children hold the space
    Split,
    /// Leaf held by the named reservation
    Allocated(&'a str),
}

impl fmt::Display for BlockState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockState::Free => f.write_str("FREE"),
            BlockState::Split => f.write_str("SPLIT"),
            BlockState::Allocated(tag) => write!(f, "ALLOCATED ({})", tag),
        }
    }
}

/// Owned snapshot of a reserved block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub address: usize,
    pub size: usize,
    pub tag: String,
}
