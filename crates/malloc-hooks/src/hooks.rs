//! The instrumentation context: hook state, ledger and the bookkeeping run by
//! the interception point on every allocate and free.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::counters::Snapshot;
use crate::error::HookError;
use crate::ledger::{Ledger, Released};
use crate::reentrancy::ReentrancyGuard;

/// Whether allocate/free calls are currently being recorded.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HookState {
    #[default]
    Uninstalled = 0,
    Installed = 1,
}

impl HookState {
    #[inline]
    fn from_u8(value: u8) -> Self {
        if value == HookState::Installed as u8 {
            HookState::Installed
        } else {
            HookState::Uninstalled
        }
    }
}

/// Process-wide instrumentation state behind the interception point.
///
/// One instance, [`MALLOC_HOOKS`], backs the crate-level functions and the
/// `global` feature's allocator. The type has a `const` constructor, so an
/// embedder can own a separate instance and inject it into its own
/// [`HookedAllocator`](crate::HookedAllocator).
///
/// While [`HookState::Installed`], every block allocated through the owning
/// allocator is kept in a ledger keyed by address, and the outstanding count
/// and byte total always equal the number of entries and the sum of their
/// sizes whenever no allocate or free is in flight.
pub struct MallocHooks {
    state: AtomicU8,
    // Serialises install, tear-down and reset against each other.
    transition: spin::Mutex<()>,
    ledger: Ledger,
}

/// The context used by the crate-level functions.
pub static MALLOC_HOOKS: MallocHooks = MallocHooks::new();

/// Bookkeeping carried between the two halves of an intercepted `realloc`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PendingRealloc {
    released: Option<Released>,
}

impl Default for MallocHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl MallocHooks {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(HookState::Uninstalled as u8),
            transition: spin::Mutex::new(()),
            ledger: Ledger::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> HookState {
        HookState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_installed(&self) -> bool {
        self.state() == HookState::Installed
    }

    /// Starts recording allocations. Calling it while already installed is a
    /// no-op; use [`MallocHooks::try_init_once`] to treat that as an error.
    pub fn init_once(&self) {
        if let Err(HookError::AlreadyInstalled) = self.try_init_once() {
            let _scope = ReentrancyGuard::enter();
            tracing::debug!("malloc hooks already installed, ignoring init");
        }
    }

    /// Starts recording allocations, failing with [`HookError::AlreadyInstalled`]
    /// if that is already the case.
    pub fn try_init_once(&self) -> Result<(), HookError> {
        let _transition = self.transition.lock();

        self.state
            .compare_exchange(
                HookState::Uninstalled as u8,
                HookState::Installed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| HookError::AlreadyInstalled)?;

        let _scope = ReentrancyGuard::enter();
        tracing::debug!("malloc hooks installed");
        Ok(())
    }

    /// Stops recording and discards the ledger and counters. Safe to call when
    /// nothing was ever installed.
    pub fn tear_down(&self) {
        let _transition = self.transition.lock();
        let _scope = ReentrancyGuard::enter();

        let previous = self
            .state
            .swap(HookState::Uninstalled as u8, Ordering::AcqRel);
        if HookState::from_u8(previous) == HookState::Uninstalled {
            tracing::debug!("malloc hooks not installed, nothing to tear down");
            return;
        }

        // Any insert that raced the state change either landed before this
        // clear or re-checks the state under its shard lock and backs off.
        let discarded = self.ledger.clear(true);
        tracing::debug!(
            allocation_count = discarded.allocation_count,
            heap_allocated_memory_in_bytes = discarded.heap_allocated_memory_in_bytes,
            "malloc hooks torn down"
        );
    }

    /// Forgets every tracked block and zeroes both counters, leaving the hook
    /// state as it is.
    pub fn reset_stats(&self) {
        let _transition = self.transition.lock();
        let _scope = ReentrancyGuard::enter();

        let discarded = self.ledger.clear(false);
        tracing::debug!(
            allocation_count = discarded.allocation_count,
            heap_allocated_memory_in_bytes = discarded.heap_allocated_memory_in_bytes,
            installed = self.is_installed(),
            "malloc hooks stats reset"
        );
    }

    #[inline]
    pub fn allocation_count(&self) -> u64 {
        self.snapshot().allocation_count
    }

    #[inline]
    pub fn heap_allocated_memory_in_bytes(&self) -> u64 {
        self.snapshot().heap_allocated_memory_in_bytes
    }

    /// Reads both counters in one pass.
    ///
    /// Every allocate or free is reflected either fully or not at all, but
    /// calls that complete while the shards are being visited may or may not
    /// be included.
    pub fn snapshot(&self) -> Snapshot {
        self.ledger.snapshot()
    }

    /// Allocate-path bookkeeping: records `size` bytes at `ptr` after the real
    /// allocator returned it. Null results are ignored.
    #[inline]
    pub fn record_alloc(&self, ptr: *mut u8, size: usize) {
        if ptr.is_null() || !self.is_installed() {
            return;
        }
        let Some(_scope) = ReentrancyGuard::enter() else {
            return;
        };

        self.ledger.insert(ptr as usize, size, || self.is_installed());
    }

    /// Free-path bookkeeping, run before the block is handed back to the real
    /// allocator. Null and untracked addresses leave the counters untouched.
    #[inline]
    pub fn record_free(&self, ptr: *mut u8) {
        let _ = self.release(ptr);
    }

    #[inline]
    fn release(&self, ptr: *mut u8) -> Option<Released> {
        if ptr.is_null() || !self.is_installed() {
            return None;
        }
        let _scope = ReentrancyGuard::enter()?;

        self.ledger.remove(ptr as usize)
    }

    /// First half of a reallocation: the old block stops being tracked before
    /// the real allocator may hand its address to another thread.
    #[inline]
    pub(crate) fn begin_realloc(&self, ptr: *mut u8) -> PendingRealloc {
        PendingRealloc {
            released: self.release(ptr),
        }
    }

    /// Second half of a reallocation. On success the new block is tracked
    /// with `new_size`; on failure the old block is still live, so its entry
    /// goes back unless the ledger was cleared meanwhile.
    #[inline]
    pub(crate) fn finish_realloc(
        &self,
        old_ptr: *mut u8,
        pending: PendingRealloc,
        new_ptr: *mut u8,
        new_size: usize,
    ) {
        if !new_ptr.is_null() {
            self.record_alloc(new_ptr, new_size);
            return;
        }

        let Some(released) = pending.released else {
            return;
        };
        let Some(_scope) = ReentrancyGuard::enter() else {
            return;
        };
        self.ledger.reinstate(old_ptr as usize, released, || self.is_installed());
    }

    #[cfg(test)]
    pub(crate) fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
