use serde::{Deserialize, Serialize};
use std::fmt;

use crate::output::format_bytes;

/// Outstanding allocation count and byte total, as one value.
///
/// Returned by [`snapshot()`](crate::snapshot). Both fields are read together,
/// so a count never shows up without the bytes that came with it.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    /// Blocks allocated and not yet freed since the last reset.
    pub allocation_count: u64,
    /// Sum of the requested sizes of those blocks.
    pub heap_allocated_memory_in_bytes: u64,
}

impl Snapshot {
    pub const ZERO: Snapshot = Snapshot {
        allocation_count: 0,
        heap_allocated_memory_in_bytes: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.allocation_count == 0 && self.heap_allocated_memory_in_bytes == 0
    }
}

impl std::ops::AddAssign for Snapshot {
    fn add_assign(&mut self, other: Self) {
        self.allocation_count += other.allocation_count;
        self.heap_allocated_memory_in_bytes += other.heap_allocated_memory_in_bytes;
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} allocations, {}",
            self.allocation_count,
            format_bytes(self.heap_allocated_memory_in_bytes)
        )
    }
}

/// The counter pair kept next to each ledger shard.
///
/// Only mutated while the owning shard is locked, which is what makes the
/// count and byte updates of one operation a single unit.
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    allocation_count: u64,
    heap_allocated_memory_in_bytes: u64,
}

impl StatCounters {
    pub(crate) const fn new() -> Self {
        Self {
            allocation_count: 0,
            heap_allocated_memory_in_bytes: 0,
        }
    }

    #[inline]
    pub(crate) fn record_alloc(&mut self, size: usize) {
        self.allocation_count += 1;
        self.heap_allocated_memory_in_bytes += size as u64;
    }

    #[inline]
    pub(crate) fn record_free(&mut self, size: usize) {
        debug_assert!(self.allocation_count > 0);
        debug_assert!(self.heap_allocated_memory_in_bytes >= size as u64);

        self.allocation_count = self.allocation_count.saturating_sub(1);
        self.heap_allocated_memory_in_bytes = self
            .heap_allocated_memory_in_bytes
            .saturating_sub(size as u64);
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            allocation_count: self.allocation_count,
            heap_allocated_memory_in_bytes: self.heap_allocated_memory_in_bytes,
        }
    }
}
