//! Slab header, construction and bin population.
//!
//! A slab is a doubly-linked-list node (`prev`/`next`, `ALIGN`-aligned)
//! followed immediately by slot storage: either one huge slot, or
//! `SLAB_MUL` equally-sized slots belonging to one bin.

use core::mem::size_of;
use core::ptr::NonNull;

use crate::constants::{ALIGN, SLOT_OVERHEAD, align_up_usize};
use crate::slot::{Slot, SlotFlags};
use crate::sys;

/// Intrusive doubly-linked-list node. Exists only so a huge slot's `free`
/// can unlink its slab in O(1); normal-slot frees never touch this list.
#[repr(C)]
pub struct SlabHeader {
    pub prev: Option<NonNull<SlabHeader>>,
    pub next: Option<NonNull<SlabHeader>>,
}

/// Offset of the first slot from the start of a slab, i.e. the slab header
/// padded up to `ALIGN`.
#[inline]
pub fn first_slot_offset() -> usize {
    align_up_usize(size_of::<SlabHeader>(), ALIGN)
}

/// Total bytes to request from the backing allocator for a slab holding
/// `count` slots of `payload_size` bytes each.
#[inline]
pub fn alloc_len(payload_size: usize, count: usize) -> usize {
    first_slot_offset() + count * (payload_size + SLOT_OVERHEAD)
}

/// Acquire a fresh, unlinked slab sized for `count` slots of
/// `payload_size` bytes. Returns `None` on backing-allocator failure.
pub fn create(payload_size: usize, count: usize) -> Option<NonNull<SlabHeader>> {
    let len = alloc_len(payload_size, count);
    let raw = sys::alloc_aligned(len, ALIGN)?;
    let header: NonNull<SlabHeader> = raw.cast();
    unsafe {
        header.as_ptr().write(SlabHeader {
            prev: None,
            next: None,
        });
    }
    tracing::trace!(slab = ?header.as_ptr(), payload_size, count, "slab created");
    Some(header)
}

/// Release a slab back to the backing allocator. `payload_size`/`count`
/// must match what the slab was created with (or `count == 1` for a huge
/// slab) so the correct `Layout` is reconstructed.
pub fn destroy(header: NonNull<SlabHeader>, payload_size: usize, count: usize) {
    let len = alloc_len(payload_size, count);
    tracing::trace!(slab = ?header.as_ptr(), "slab released");
    unsafe { sys::dealloc_aligned(header.cast(), len, ALIGN) };
}

/// The first slot's header pointer within a slab.
#[inline]
pub fn first_slot(header: NonNull<SlabHeader>) -> Slot {
    let base = unsafe { NonNull::new_unchecked(header.as_ptr().cast::<u8>().add(first_slot_offset())) };
    unsafe { Slot::from_header(base) }
}

/// Lay out `count` slots of `size` bytes in order within the slab, writing
/// fresh (unused) guards into each, and splice the whole run onto
/// `bin_head` in a single pass: slot 0, slot 1, ..., slot `count - 1`, then
/// whatever was previously the head.
///
/// After this call `*bin_head == Some(slot 0)`.
pub fn init_bin(header: NonNull<SlabHeader>, size: usize, count: usize, bin_head: &mut Option<NonNull<u8>>) {
    debug_assert!(count > 0);
    let stride = size + SLOT_OVERHEAD;
    let base = unsafe { header.as_ptr().cast::<u8>().add(first_slot_offset()) };

    let slot_at = |j: usize| unsafe {
        let ptr = NonNull::new_unchecked(base.add(j * stride));
        Slot::from_header(ptr)
    };

    for j in 0..count {
        let slot = slot_at(j);
        unsafe { slot.write_guards(size as u32, SlotFlags::empty()) };
        let next_link = if j + 1 < count {
            slot_at(j + 1).header_ptr().as_ptr()
        } else {
            bin_head.map_or(core::ptr::null_mut(), |p| p.as_ptr())
        };
        unsafe { slot.set_next_link(next_link) };
    }

    *bin_head = Some(slot_at(0).header_ptr());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_slot_offset_is_align_multiple() {
        assert_eq!(first_slot_offset() % ALIGN, 0);
        assert!(first_slot_offset() >= size_of::<SlabHeader>());
    }

    #[test]
    fn create_and_destroy_round_trip() {
        let slab = create(16, 4).expect("backing alloc should succeed");
        destroy(slab, 16, 4);
    }

    #[test]
    fn init_bin_links_slots_lifo_then_prior_head() {
        let slab = create(16, 4).unwrap();
        let mut bin_head: Option<NonNull<u8>> = None;
        init_bin(slab, 16, 4, &mut bin_head);

        let slot0 = first_slot(slab);
        assert_eq!(bin_head, Some(slot0.header_ptr()));

        // Walk the chain: slot0 -> slot1 -> slot2 -> slot3 -> null.
        let mut cur = bin_head.unwrap();
        let mut seen = 0;
        loop {
            let slot = unsafe { Slot::from_header(cur) };
            seen += 1;
            let next = unsafe { slot.next_link() };
            if next.is_null() {
                break;
            }
            cur = NonNull::new(next).unwrap();
        }
        assert_eq!(seen, 4);

        destroy(slab, 16, 4);
    }

    #[test]
    fn init_bin_prepends_to_existing_head() {
        let slab_a = create(16, 2).unwrap();
        let mut bin_head: Option<NonNull<u8>> = None;
        init_bin(slab_a, 16, 2, &mut bin_head);
        let old_head = bin_head.unwrap();

        let slab_b = create(16, 2).unwrap();
        init_bin(slab_b, 16, 2, &mut bin_head);
        let new_head = bin_head.unwrap();
        assert_ne!(new_head, old_head);

        // Walking from the new head must eventually reach the old head.
        let mut cur = new_head;
        let mut found = false;
        for _ in 0..4 {
            if cur == old_head {
                found = true;
                break;
            }
            let slot = unsafe { Slot::from_header(cur) };
            let next = unsafe { slot.next_link() };
            if next.is_null() {
                break;
            }
            cur = NonNull::new(next).unwrap();
        }
        assert!(found, "slab_b's slots should chain into slab_a's prior head");

        destroy(slab_a, 16, 2);
        destroy(slab_b, 16, 2);
    }
}
