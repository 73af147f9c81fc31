//! Read-only inspection of the block tree
//!
//! Pre-order walk and the indented tree text printed by the shell.

use alloc::vec::Vec;
use core::fmt;

use super::{
    block::{BlockId, BlockState},
    buddy_allocator::BuddyAllocator,
};

const INDENT: &str = "  ";
const RULE: &str = "---------------------------";

/// One visited block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockView<'a> {
    pub id: BlockId,
    pub depth: usize,
    pub address: usize,
    pub size: usize,
    pub state: BlockState<'a>,
}

impl BuddyAllocator {
    /// Depth-first pre-order walk from the root, left child before right
    pub fn walk(&self) -> Vec<BlockView<'_>> {
        let mut views = Vec::new();
        let mut stack = alloc::vec![(self.root(), 0)];

        while let Some((id, depth)) = stack.pop() {
            let Some(block) = self.block(id) else {
                continue;
            };
            views.push(BlockView {
                id,
                depth,
                address: block.address,
                size: block.size,
                state: block.state(),
            });
            if let (Some(left), Some(right)) = (block.left, block.right) {
                stack.push((right, depth + 1));
                stack.push((left, depth + 1));
            }
        }
        views
    }

    /// Displayable rendering of the whole tree
    pub fn render(&self) -> TreeView<'_> {
        TreeView { allocator: self }
    }
}

/// Indented tree text of an allocator
pub struct TreeView<'a> {
    allocator: &'a BuddyAllocator,
}

impl fmt::Display for TreeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Memory state")?;
        for view in self.allocator.walk() {
            for _ in 0..view.depth {
                f.write_str(INDENT)?;
            }
            writeln!(
                f,
                "├─ [Addr: {}, Size: {}, {}]",
                view.address, view.size, view.state
            )?;
        }
        f.write_str(RULE)
    }
}
