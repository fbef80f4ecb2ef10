use std::alloc::{GlobalAlloc, Layout, System};

use crate::hooks::MallocHooks;

/// Global allocator wrapper that feeds every allocate and free of `A` into a
/// [`MallocHooks`] context.
///
/// The wrapped allocator's results are returned untouched, including null on
/// exhaustion. Recording only happens while the context is installed, so
/// registering the wrapper costs one atomic load per call until
/// [`init_once`](crate::init_once) runs.
///
/// Blocks are recorded with the size the caller asked for
/// ([`Layout::size`]); `GlobalAlloc` has no way to report how much the
/// wrapped allocator actually reserved.
///
/// ```rust,ignore
/// use malloc_hooks::{HookedAllocator, MALLOC_HOOKS};
/// use std::alloc::System;
///
/// #[global_allocator]
/// static GLOBAL: HookedAllocator = HookedAllocator::new(System, &MALLOC_HOOKS);
/// ```
pub struct HookedAllocator<A = System> {
    inner: A,
    hooks: &'static MallocHooks,
}

impl<A> HookedAllocator<A> {
    pub const fn new(inner: A, hooks: &'static MallocHooks) -> Self {
        Self { inner, hooks }
    }

    pub fn hooks(&self) -> &'static MallocHooks {
        self.hooks
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for HookedAllocator<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc(layout) };
        self.hooks.record_alloc(ptr, layout.size());
        ptr
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        self.hooks.record_alloc(ptr, layout.size());
        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.hooks.record_free(ptr);

        unsafe {
            self.inner.dealloc(ptr, layout);
        }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let pending = self.hooks.begin_realloc(ptr);
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
        self.hooks.finish_realloc(ptr, pending, new_ptr, new_size);
        new_ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static HOOKS: MallocHooks = MallocHooks::new();

    struct Exhausted;

    unsafe impl GlobalAlloc for Exhausted {
        unsafe fn alloc(&self, _layout: Layout) -> *mut u8 {
            std::ptr::null_mut()
        }

        unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {}
    }

    #[test]
    fn test_wrapped_allocator_roundtrip() {
        // Owns its context, so nothing else in the test binary shows up here.
        let allocator = HookedAllocator::new(System, &HOOKS);
        allocator.hooks().init_once();

        let small = Layout::from_size_align(64, 8).unwrap();
        let large = Layout::from_size_align(128, 64).unwrap();

        unsafe {
            let a = allocator.alloc(small);
            let b = allocator.alloc_zeroed(large);
            assert!(!a.is_null() && !b.is_null());
            assert_eq!(b as usize % 64, 0, "alignment must be preserved");
            assert_eq!(*b, 0);
            assert_eq!(HOOKS.allocation_count(), 2);
            assert_eq!(HOOKS.heap_allocated_memory_in_bytes(), 192);

            let a = allocator.realloc(a, small, 1024);
            assert!(!a.is_null());
            assert_eq!(HOOKS.allocation_count(), 2);
            assert_eq!(HOOKS.heap_allocated_memory_in_bytes(), 1024 + 128);

            allocator.dealloc(a, Layout::from_size_align(1024, 8).unwrap());
            allocator.dealloc(b, large);
        }

        assert!(HOOKS.snapshot().is_empty());
        HOOKS.tear_down();
    }

    #[test]
    fn test_exhaustion_passes_through() {
        static EXHAUSTED_HOOKS: MallocHooks = MallocHooks::new();
        let allocator = HookedAllocator::new(Exhausted, &EXHAUSTED_HOOKS);
        allocator.hooks().init_once();

        let layout = Layout::from_size_align(4096, 16).unwrap();
        let ptr = unsafe { allocator.alloc(layout) };

        assert!(ptr.is_null());
        assert!(EXHAUSTED_HOOKS.snapshot().is_empty());
    }
}
