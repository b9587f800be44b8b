//! Backing allocator boundary.
//!
//! Every slab acquisition and release funnels through here. Failures come
//! back as `None` instead of panicking or aborting; the caller (`slab.rs`)
//! propagates that into the pool's null-on-failure contract.

use std::alloc::Layout;
use std::ptr::NonNull;

/// Acquire `len` bytes aligned to `align` from the process allocator.
/// Returns `None` on allocation failure or an invalid layout; never panics
/// or aborts.
pub fn alloc_aligned(len: usize, align: usize) -> Option<NonNull<u8>> {
    let layout = Layout::from_size_align(len, align).ok()?;
    let ptr = unsafe { std::alloc::alloc(layout) };
    let result = NonNull::new(ptr);
    if result.is_none() {
        tracing::warn!(len, align, "backing allocator returned null");
    } else {
        tracing::trace!(len, align, "backing allocation acquired");
    }
    result
}

/// Release a chunk previously returned by `alloc_aligned` with the same
/// `len`/`align`.
///
/// # Safety
/// `ptr` must have come from `alloc_aligned(len, align)` and must not be
/// used again after this call.
pub unsafe fn dealloc_aligned(ptr: NonNull<u8>, len: usize, align: usize) {
    let layout = Layout::from_size_align(len, align).expect("layout was valid at allocation time");
    unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
}
