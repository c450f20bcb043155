//! Pluggable memory backend (spec §4.2 "Allocator").
//!
//! Selected per-operation rather than process-global: callers pass an
//! `Arc<dyn Allocator>` (or omit it to get [`SystemAllocator`]) to the
//! handful of operations the spec calls out as allocator-aware (`inspect`,
//! `create_array`/`create_map`, the serial codecs' `initialize`).

use std::alloc::{self, Layout};
use std::sync::Arc;

/// A raw `(alloc, realloc, free)` memory backend, mirroring the spec's
/// allocator interface. Implementations must uphold the usual `Layout`
/// contract: `free`/`realloc` must be called with the same layout (or a
/// layout compatible per `realloc`'s rules) used to allocate the block.
pub trait Allocator: Send + Sync {
    /// Allocates a block for `layout`, or null on failure.
    fn alloc(&self, layout: Layout) -> *mut u8;

    /// Reallocates `ptr` (allocated with `old_layout`) to `new_size`, or
    /// null on failure, in which case `ptr` remains valid.
    fn realloc(&self, ptr: *mut u8, old_layout: Layout, new_size: usize) -> *mut u8;

    /// Releases a block allocated with `layout`.
    fn free(&self, ptr: *mut u8, layout: Layout);
}

/// The default allocator: the process's global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn alloc(&self, layout: Layout) -> *mut u8 {
        // Safety: `layout` is caller-supplied and non-zero-sized by
        // `Layout` construction invariants.
        unsafe { alloc::alloc(layout) }
    }

    fn realloc(&self, ptr: *mut u8, old_layout: Layout, new_size: usize) -> *mut u8 {
        // Safety: `ptr` must have been allocated with `old_layout` by this
        // same allocator, per this trait's contract.
        unsafe { alloc::realloc(ptr, old_layout, new_size) }
    }

    fn free(&self, ptr: *mut u8, layout: Layout) {
        // Safety: see `realloc`.
        unsafe { alloc::dealloc(ptr, layout) }
    }
}

/// A shared handle to an allocator, threaded explicitly through the
/// operations that need one. Defaults to [`SystemAllocator`].
pub type AllocatorHandle = Arc<dyn Allocator>;

/// Returns the process-default allocator handle.
pub fn system() -> AllocatorHandle {
    Arc::new(SystemAllocator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocator_round_trips() {
        let a = SystemAllocator;
        let layout = Layout::from_size_align(64, 8).unwrap();
        let ptr = a.alloc(layout);
        assert!(!ptr.is_null());
        a.free(ptr, layout);
    }
}
