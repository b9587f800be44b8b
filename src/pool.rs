//! Pool façade: `create`/`reset`/`destroy`/`alloc`/`calloc`/`free`.
//!
//! Each `Pool` owns its bins and slab list outright; there is no shared
//! state between instances and no cross-pool sharing of any kind.

use core::mem::{align_of, size_of};
use core::ptr::NonNull;

use crate::constants::{BINS, MAX_ALLOC, MAX_POOLED, SLAB_MUL, bin_index, round_request};
use crate::slab::{self, SlabHeader};
use crate::slot::{Slot, SlotFlags, unpack_flags, unpack_size};
use crate::sys;

/// A pool-local array of `BINS` LIFO free lists, plus the head of the
/// pool's doubly-linked slab list.
pub struct Pool {
    bins: [Option<NonNull<u8>>; BINS],
    slabs: Option<NonNull<SlabHeader>>,
}

// SAFETY: `Pool` owns all the raw pointers it holds; it is `Send` as long as
// access is serialized by the caller, or wrapped in `SharedPool` for
// cross-thread use.
unsafe impl Send for Pool {}

impl Pool {
    /// Allocate a fresh pool with every bin empty and no slabs.
    ///
    /// The pool object itself is acquired from the backing allocator via
    /// `[SYS]`, exactly like a slab; `None` is returned if that allocation
    /// fails.
    pub fn create() -> Option<Box<Pool>> {
        let raw = sys::alloc_aligned(size_of::<Pool>(), align_of::<Pool>())?;
        let ptr: NonNull<Pool> = raw.cast();
        unsafe {
            ptr.as_ptr().write(Pool {
                bins: [None; BINS],
                slabs: None,
            });
        }
        // SAFETY: `ptr` was just allocated with `Layout::new::<Pool>()`
        // (`size_of`/`align_of` match exactly), so `Box`'s eventual
        // deallocation uses the same layout it was allocated with.
        let pool = unsafe { Box::from_raw(ptr.as_ptr()) };
        tracing::debug!(pool = ?(&*pool as *const Pool), "pool created");
        Some(pool)
    }

    /// Soft reset: reclaim all live allocations, release huge slabs,
    /// retain and re-thread normal slabs so the next `alloc` costs zero
    /// backing-allocator calls.
    pub fn reset(&mut self) {
        self.reset_impl(false);
        tracing::debug!("pool reset (soft)");
    }

    /// Hard reset + release the pool's own bookkeeping. Consumes `self` so
    /// the handle cannot be used again afterward.
    pub fn destroy(mut self) {
        self.reset_impl(true);
        tracing::debug!("pool destroyed");
    }

    fn reset_impl(&mut self, hard: bool) {
        for bin in &mut self.bins {
            *bin = None;
        }

        // `.take()` clears `self.slabs`; the soft path rebuilds it below by
        // re-pushing each retained slab as the walk proceeds.
        let mut slab = self.slabs.take();

        while let Some(header) = slab {
            let next = unsafe { header.as_ref().next };

            let first = slab::first_slot(header);
            let head = unsafe { first.head() };
            let flags = unpack_flags(head);
            let size = unpack_size(head) as usize;

            if flags.contains(SlotFlags::HUGE) {
                slab::destroy(header, size, 1);
            } else if hard {
                slab::destroy(header, size, SLAB_MUL);
            } else {
                self.push_slab(header);
                let idx = bin_index(size);
                slab::init_bin(header, size, SLAB_MUL, &mut self.bins[idx]);
            }

            slab = next;
        }
    }

    fn push_slab(&mut self, mut header: NonNull<SlabHeader>) {
        unsafe {
            header.as_mut().prev = None;
            header.as_mut().next = self.slabs;
        }
        if let Some(mut old_head) = self.slabs {
            unsafe { old_head.as_mut().prev = Some(header) };
        }
        self.slabs = Some(header);
    }

    fn unlink_slab(&mut self, mut header: NonNull<SlabHeader>) {
        let (prev, next) = unsafe { (header.as_ref().prev, header.as_ref().next) };
        match prev {
            Some(mut p) => unsafe { p.as_mut().next = next },
            None => self.slabs = next,
        }
        if let Some(mut n) = next {
            unsafe { n.as_mut().prev = prev };
        }
        unsafe {
            header.as_mut().prev = None;
            header.as_mut().next = None;
        }
    }

    /// Allocate `size` bytes, rounded up to `SLOT_ALIGN` and clamped to
    /// `MIN_ALLOC`. Returns null on `size > MAX_ALLOC` or backing-allocator
    /// failure.
    pub fn alloc(&mut self, size: usize) -> *mut u8 {
        if size > MAX_ALLOC {
            tracing::warn!(size, max = MAX_ALLOC, "alloc request exceeds MAX_ALLOC");
            return core::ptr::null_mut();
        }
        let size = round_request(size);

        if size > MAX_POOLED {
            return self.alloc_huge(size);
        }
        self.alloc_pooled(size)
    }

    fn alloc_huge(&mut self, size: usize) -> *mut u8 {
        let Some(header) = slab::create(size, 1) else {
            return core::ptr::null_mut();
        };
        self.push_slab(header);
        let slot = slab::first_slot(header);
        unsafe { slot.write_guards(size as u32, SlotFlags::USED | SlotFlags::HUGE) };
        slot.data_ptr().as_ptr()
    }

    fn alloc_pooled(&mut self, size: usize) -> *mut u8 {
        let idx = bin_index(size);
        if self.bins[idx].is_none() {
            let Some(header) = slab::create(size, SLAB_MUL) else {
                return core::ptr::null_mut();
            };
            self.push_slab(header);
            slab::init_bin(header, size, SLAB_MUL, &mut self.bins[idx]);
        }

        let head = self.bins[idx].expect("bin was just populated or already non-empty");
        let slot = unsafe { Slot::from_header(head) };
        let next = unsafe { slot.next_link() };
        self.bins[idx] = NonNull::new(next);
        unsafe { slot.write_guards(size as u32, SlotFlags::USED) };
        slot.data_ptr().as_ptr()
    }

    /// As `alloc`, but zero-fills exactly `size` requested bytes (not the
    /// rounded-up slot payload) before returning.
    pub fn calloc(&mut self, size: usize) -> *mut u8 {
        let data = self.alloc(size);
        if !data.is_null() {
            unsafe { core::ptr::write_bytes(data, 0, size) };
        }
        data
    }

    /// Return `data` (previously returned by `alloc`/`calloc`) to the
    /// pool. No-op if `data` is null.
    ///
    /// # Safety
    /// `data` must be a pointer this pool itself handed out and that has
    /// not already been freed.
    pub fn free(&mut self, data: *mut u8) {
        let Some(data) = NonNull::new(data) else {
            return;
        };
        let slot = unsafe { Slot::from_data_ptr(data) };
        let head = unsafe { slot.head() };
        let size = unpack_size(head);
        let flags = unpack_flags(head);
        let foot = unsafe { slot.foot(size) };

        if head != foot || !flags.contains(SlotFlags::USED) {
            self.handle_corruption(slot, head, foot);
            return;
        }

        if flags.contains(SlotFlags::HUGE) {
            let header = slab_header_of(slot);
            self.unlink_slab(header);
            slab::destroy(header, size as usize, 1);
            return;
        }

        unsafe { slot.write_guards(size, SlotFlags::empty()) };
        let idx = bin_index(size as usize);
        let next = self.bins[idx].map_or(core::ptr::null_mut(), |p| p.as_ptr());
        unsafe { slot.set_next_link(next) };
        self.bins[idx] = Some(slot.header_ptr());
    }

    #[cfg(feature = "sigsegv-on-corruption")]
    fn handle_corruption(&mut self, slot: Slot, head: u32, foot: u32) {
        tracing::error!(
            slot = ?slot.header_ptr().as_ptr(),
            head,
            foot,
            "corrupted slot guard detected in free(); raising SIGSEGV"
        );
        unsafe { libc::raise(libc::SIGSEGV) };
    }

    #[cfg(not(feature = "sigsegv-on-corruption"))]
    fn handle_corruption(&mut self, slot: Slot, head: u32, foot: u32) {
        let _ = self;
        tracing::warn!(
            slot = ?slot.header_ptr().as_ptr(),
            head,
            foot,
            "corrupted slot guard detected in free(); dropping the free"
        );
    }
}

/// Recover the slab header a non-huge-free-ineligible slot (i.e. a known
/// huge slot) lives in. A huge slab holds exactly its one slot starting at
/// `first_slot_offset()`, so the header sits that many bytes before it.
fn slab_header_of(slot: Slot) -> NonNull<SlabHeader> {
    let header_ptr = unsafe {
        slot.header_ptr()
            .as_ptr()
            .sub(crate::slab::first_slot_offset())
    };
    unsafe { NonNull::new_unchecked(header_ptr.cast()) }
}
