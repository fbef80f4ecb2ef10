//! Process-wide heap instrumentation: the number of outstanding allocations and
//! the bytes they hold, kept live while the hooks are installed.
//!
//! Every allocate and free goes through a [`HookedAllocator`] registered as the
//! global allocator. While [`init_once`] is in effect, each block it hands out
//! is recorded in a sharded address ledger, so a later free can find the size
//! of what it releases. Nothing about the wrapped allocator's results changes.
//!
//! ## Setup & Usage
//!
//! Register the allocator (or enable the `global` feature to have this crate
//! do it over [`MALLOC_HOOKS`]):
//!
//! ```rust,ignore
//! use malloc_hooks::{HookedAllocator, MALLOC_HOOKS};
//!
//! #[global_allocator]
//! static GLOBAL: HookedAllocator = HookedAllocator::new(std::alloc::System, &MALLOC_HOOKS);
//! ```
//!
//! Then switch the hooks on around the code you care about:
//!
//! ```rust,no_run
//! malloc_hooks::init_once();
//! malloc_hooks::reset_stats();
//!
//! let data = vec![0u8; 64];
//! println!(
//!     "{} blocks, {} bytes outstanding",
//!     malloc_hooks::allocation_count(),
//!     malloc_hooks::heap_allocated_memory_in_bytes()
//! );
//! # drop(data);
//!
//! malloc_hooks::tear_down();
//! ```
//!
//! Or let `#[malloc_hooks::main]` / [`GuardBuilder`] install them for a scope
//! and print a report at its end.

mod allocator;
mod config;
mod counters;
mod error;
mod guard;
mod hooks;
mod ledger;
mod output;
mod reentrancy;

pub use allocator::HookedAllocator;
pub use config::Format;
pub use counters::Snapshot;
pub use error::HookError;
pub use guard::{GuardBuilder, HooksGuard};
pub use hooks::{HookState, MallocHooks, MALLOC_HOOKS};
pub use malloc_hooks_macros::main;
pub use output::{format_bytes, format_duration, Report, Reporter};

cfg_if::cfg_if! {
    if #[cfg(feature = "global")] {
        // Allocations of the whole process are routed through the default context
        #[global_allocator]
        static GLOBAL: HookedAllocator = HookedAllocator::new(std::alloc::System, &MALLOC_HOOKS);
    }
}

/// Installs the hooks on [`MALLOC_HOOKS`]. A no-op if they are already installed.
#[inline]
pub fn init_once() {
    MALLOC_HOOKS.init_once();
}

/// Like [`init_once`], but reports a redundant call as [`HookError::AlreadyInstalled`].
#[inline]
pub fn try_init_once() -> Result<(), HookError> {
    MALLOC_HOOKS.try_init_once()
}

/// Uninstalls the hooks and discards everything recorded. A no-op if they are
/// not installed.
#[inline]
pub fn tear_down() {
    MALLOC_HOOKS.tear_down();
}

/// Forgets all tracked blocks and zeroes both counters, keeping the hooks
/// installed (or not) as they were.
#[inline]
pub fn reset_stats() {
    MALLOC_HOOKS.reset_stats();
}

#[inline]
pub fn is_installed() -> bool {
    MALLOC_HOOKS.is_installed()
}

/// Blocks allocated and not yet freed since the last reset.
#[inline]
pub fn allocation_count() -> u64 {
    MALLOC_HOOKS.allocation_count()
}

/// Bytes held by the blocks counted in [`allocation_count`].
///
/// Read separately from the count; use [`snapshot`] when both have to agree.
#[inline]
pub fn heap_allocated_memory_in_bytes() -> u64 {
    MALLOC_HOOKS.heap_allocated_memory_in_bytes()
}

/// Both counters, read together.
#[inline]
pub fn snapshot() -> Snapshot {
    MALLOC_HOOKS.snapshot()
}

/// Resets the statistics, evaluates the expression and returns its value along
/// with the [`Snapshot`] of what is still outstanding afterwards.
///
/// The hooks have to be installed for anything to be counted.
///
/// # Examples
///
/// ```rust,no_run
/// malloc_hooks::init_once();
///
/// let (buffer, stats) = malloc_hooks::measure_block!(vec![0u64; 1000]);
/// println!("{} bytes in {} blocks", stats.heap_allocated_memory_in_bytes, stats.allocation_count);
/// # drop(buffer);
/// ```
#[macro_export]
macro_rules! measure_block {
    ($expr:expr) => {{
        $crate::reset_stats();
        let __malloc_hooks_out = $expr;
        let __malloc_hooks_stats = $crate::snapshot();
        (__malloc_hooks_out, __malloc_hooks_stats)
    }};
}
