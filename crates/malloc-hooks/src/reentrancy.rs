//! Per-thread recursion guard for the bookkeeping paths.
//!
//! Everything the ledger does while a [`ReentrancyGuard`] is alive on the
//! current thread (growing a shard map, logging from a lifecycle call) goes
//! through the same global allocator. Those nested calls find the flag set and
//! are passed straight to the wrapped allocator without being recorded.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    // Const-initialised and without a destructor, so it can be touched from
    // inside a global allocator, including while the thread is exiting.
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Scope that suppresses instrumentation on the current thread until dropped.
pub(crate) struct ReentrancyGuard {
    // Tied to the thread whose flag it set.
    _not_send: PhantomData<*const ()>,
}

impl ReentrancyGuard {
    /// Enters the scope. Returns `None` if this thread is already inside one,
    /// or if its thread-locals are no longer reachable.
    #[inline]
    pub(crate) fn enter() -> Option<Self> {
        let entered = IN_HOOK
            .try_with(|flag| !flag.replace(true))
            .unwrap_or(false);

        entered.then_some(Self {
            _not_send: PhantomData,
        })
    }
}

impl Drop for ReentrancyGuard {
    #[inline]
    fn drop(&mut self) {
        let _ = IN_HOOK.try_with(|flag| flag.set(false));
    }
}
