//! Address to size store for blocks seen by the allocate path.
//!
//! `dealloc` only hands over an address, so the size of a block being freed
//! has to be recovered from here. The ledger is split into shards picked by an
//! address hash; every shard owns its entries *and* the counters for those
//! entries, both behind one spin lock. Each allocate or free therefore updates
//! its entry, its count and its bytes in a single critical section, and the
//! process-wide totals are the sum over shards.
//!
//! Shard locks must not allocate or park, since the caller is the global
//! allocator. A shard map that grows under its lock allocates through the
//! recursion guard the caller holds, so the shard is never re-entered.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use spin::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::counters::{Snapshot, StatCounters};

const SHARD_BITS: u32 = 6;
pub(crate) const SHARD_COUNT: usize = 1 << SHARD_BITS;

type AddressMap = HashMap<usize, usize, FxBuildHasher>;

struct Shard {
    entries: AddressMap,
    counters: StatCounters,
}

impl Shard {
    const fn new() -> Self {
        Self {
            entries: HashMap::with_hasher(FxBuildHasher),
            counters: StatCounters::new(),
        }
    }

    #[inline]
    fn insert(&mut self, address: usize, size: usize) {
        // A leftover entry means the block was freed while instrumentation was
        // suppressed on that thread. Replace it so the counters keep matching.
        if let Some(stale) = self.entries.insert(address, size) {
            self.counters.record_free(stale);
        }
        self.counters.record_alloc(size);
    }
}

/// Entry taken out of the ledger by the first half of a reallocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Released {
    pub(crate) size: usize,
    pub(crate) epoch: u64,
}

pub(crate) struct Ledger {
    shards: [Mutex<Shard>; SHARD_COUNT],
    // Bumped by every clear, always with all shards locked.
    epoch: AtomicU64,
}

impl Ledger {
    pub(crate) const fn new() -> Self {
        Self {
            shards: [const { Mutex::new(Shard::new()) }; SHARD_COUNT],
            epoch: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, address: usize) -> MutexGuard<'_, Shard> {
        self.shards[shard_index(address)].lock()
    }

    /// Records a freshly allocated block. `live` is evaluated under the shard
    /// lock; when it returns `false` nothing is recorded.
    #[inline]
    pub(crate) fn insert(&self, address: usize, size: usize, live: impl FnOnce() -> bool) -> bool {
        let mut shard = self.shard(address);
        if !live() {
            return false;
        }
        shard.insert(address, size);
        true
    }

    /// Forgets a block that is about to be freed, returning its recorded size.
    /// Untracked addresses leave the counters alone.
    #[inline]
    pub(crate) fn remove(&self, address: usize) -> Option<Released> {
        let mut shard = self.shard(address);
        let size = shard.entries.remove(&address)?;
        shard.counters.record_free(size);

        Some(Released {
            size,
            epoch: self.epoch.load(Ordering::Acquire),
        })
    }

    /// Puts back an entry taken by [`Ledger::remove`] whose free did not happen.
    /// Skipped if the ledger was cleared in between.
    pub(crate) fn reinstate(
        &self,
        address: usize,
        released: Released,
        live: impl FnOnce() -> bool,
    ) -> bool {
        let mut shard = self.shard(address);
        if self.epoch.load(Ordering::Acquire) != released.epoch || !live() {
            return false;
        }
        shard.insert(address, released.size);
        true
    }

    /// Drops every entry and zeroes every counter as one step, returning what
    /// was discarded. With `release_memory` the shard tables are freed too.
    pub(crate) fn clear(&self, release_memory: bool) -> Snapshot {
        // Ascending index order, same as any other multi-shard lock.
        let mut shards: Vec<MutexGuard<'_, Shard>> =
            self.shards.iter().map(|shard| shard.lock()).collect();

        let mut discarded = Snapshot::ZERO;
        for shard in shards.iter_mut() {
            discarded += shard.counters.snapshot();
            shard.counters.clear();
            if release_memory {
                shard.entries = HashMap::with_hasher(FxBuildHasher);
            } else {
                shard.entries.clear();
            }
        }
        self.epoch.fetch_add(1, Ordering::AcqRel);

        discarded
    }

    /// Sums the per-shard counters. Each shard's pair is read under its lock.
    pub(crate) fn snapshot(&self) -> Snapshot {
        let mut total = Snapshot::ZERO;
        for shard in &self.shards {
            total += shard.lock().counters.snapshot();
        }
        total
    }

    /// Totals recomputed from the entries themselves rather than the counters.
    #[cfg(test)]
    pub(crate) fn entry_totals(&self) -> Snapshot {
        let mut total = Snapshot::ZERO;
        for shard in &self.shards {
            let shard = shard.lock();
            total += Snapshot {
                allocation_count: shard.entries.len() as u64,
                heap_allocated_memory_in_bytes: shard.entries.values().map(|&s| s as u64).sum(),
            };
        }
        total
    }
}

#[inline]
fn shard_index(address: usize) -> usize {
    // Fibonacci hashing. The low bits are alignment and carry nothing.
    let mixed = ((address as u64) >> 4).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    (mixed >> (u64::BITS - SHARD_BITS)) as usize
}
