//! Statistics and debugging for buddy allocator
//!
//! Provides allocator snapshots and failure reporting.

use alloc::vec::Vec;

#[cfg(feature = "log")]
use log::debug;

/// Buddy allocator statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuddyStats {
    pub total_units: usize,
    pub free_units: usize,
    /// Units held by reservations after power-of-two rounding
    pub used_units: usize,
    /// Units actually asked for by live reservations
    pub requested_units: usize,
    pub allocations: usize,
    pub largest_free_block: Option<usize>,
    pub free_blocks_by_level: Vec<usize>,
    #[cfg(feature = "tracking")]
    pub total_reservations: usize,
    #[cfg(feature = "tracking")]
    pub total_releases: usize,
}

impl BuddyStats {
    /// Units lost to rounding requests up to a power of two
    pub fn internal_fragmentation(&self) -> usize {
        self.used_units.saturating_sub(self.requested_units)
    }

    /// Units that are free but not reachable by one maximal reservation
    pub fn external_fragmentation(&self) -> usize {
        self.free_units
            .saturating_sub(self.largest_free_block.unwrap_or(0))
    }
}

/// Detailed memory statistics reporter
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Log why a reservation could not be satisfied
    #[allow(unused_variables)]
    pub fn log_reserve_failure(stats: &BuddyStats, requested: usize, tag: &str) {
        debug!("========================================");
        debug!("Request: {} units for '{}'", requested, tag);
        debug!(
            "  Total: {}  Free: {}  Used: {}",
            stats.total_units, stats.free_units, stats.used_units
        );
        debug!("  Free blocks by level:");

        for (level, &count) in stats.free_blocks_by_level.iter().enumerate().rev() {
            if count > 0 {
                debug!(
                    "    Level {}: {} blocks ({} units each, {} units total)",
                    level,
                    count,
                    1usize << level,
                    count << level
                );
            }
        }
        debug!("========================================");
    }
}
