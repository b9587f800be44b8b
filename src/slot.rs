//! Slot header/footer guard layout.
//!
//! A slot is three contiguous regions: a 32-bit head, the payload, and a
//! 32-bit foot that must equal the head at all times the slot is valid.
//! While free, the payload's first pointer-sized word doubles as the
//! free-list `next` link (see `Slot::next`/`Slot::set_next`) — there is no
//! spare metadata word for it; the free list is threaded directly through
//! unused object storage.

use core::ptr::NonNull;

use bitflags::bitflags;

bitflags! {
    /// Flag bits packed into the top two bits of a slot's head/foot word.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct SlotFlags: u32 {
        /// Slot is held by a client (not on a bin free list).
        const USED = 1 << 30;
        /// Slot is the sole occupant of its slab; `size` is unbinned.
        const HUGE = 1 << 31;
    }
}

const SIZE_MASK: u32 = (1 << 30) - 1;

/// A guard word: low 30 bits are the payload size, bits 30/31 are flags.
#[inline]
pub const fn pack(size: u32, flags: SlotFlags) -> u32 {
    (size & SIZE_MASK) | flags.bits()
}

#[inline]
pub const fn unpack_size(word: u32) -> u32 {
    word & SIZE_MASK
}

#[inline]
pub fn unpack_flags(word: u32) -> SlotFlags {
    SlotFlags::from_bits_truncate(word & !SIZE_MASK)
}

/// A typed view over one slot's memory. Does not own the memory; every
/// method is `unsafe` to call because the caller must guarantee `base`
/// points at `size + SLOT_OVERHEAD` live, writable bytes.
#[derive(Clone, Copy)]
pub struct Slot {
    base: NonNull<u8>,
}

impl Slot {
    /// Wrap a slot whose header starts at `base`.
    ///
    /// # Safety
    /// `base` must point at a live slot's header (offset 0 of the
    /// head/payload/foot layout).
    #[inline]
    pub unsafe fn from_header(base: NonNull<u8>) -> Self {
        Slot { base }
    }

    /// Recover the slot owning a data pointer previously handed to a
    /// client (the data pointer sits 4 bytes past the header).
    ///
    /// # Safety
    /// `data` must be a pointer previously returned by `alloc`/`calloc` on
    /// a live, non-destroyed pool.
    #[inline]
    pub unsafe fn from_data_ptr(data: NonNull<u8>) -> Self {
        let base = unsafe { NonNull::new_unchecked(data.as_ptr().sub(4)) };
        Slot { base }
    }

    #[inline]
    pub fn header_ptr(self) -> NonNull<u8> {
        self.base
    }

    /// Pointer to the client-visible data region.
    #[inline]
    pub fn data_ptr(self) -> NonNull<u8> {
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(4)) }
    }

    #[inline]
    fn head_ptr(self) -> *mut u32 {
        self.base.as_ptr().cast()
    }

    #[inline]
    fn foot_ptr(self, payload_size: u32) -> *mut u32 {
        unsafe { self.base.as_ptr().add(4 + payload_size as usize).cast() }
    }

    /// Read the head word.
    ///
    /// # Safety
    /// The slot's header bytes must be initialized.
    #[inline]
    pub unsafe fn head(self) -> u32 {
        unsafe { self.head_ptr().read_unaligned() }
    }

    /// Read the foot word, given the payload size recovered from the head.
    ///
    /// # Safety
    /// The slot's footer bytes (at `4 + payload_size`) must be initialized
    /// and within the slot's allocation.
    #[inline]
    pub unsafe fn foot(self, payload_size: u32) -> u32 {
        unsafe { self.foot_ptr(payload_size).read_unaligned() }
    }

    /// Write matching head and foot guard words.
    ///
    /// # Safety
    /// The slot must own `size + SLOT_OVERHEAD` writable bytes starting at
    /// its header.
    #[inline]
    pub unsafe fn write_guards(self, size: u32, flags: SlotFlags) {
        let word = pack(size, flags);
        unsafe {
            self.head_ptr().write_unaligned(word);
            self.foot_ptr(size).write_unaligned(word);
        }
    }

    /// Read the free-list `next` link stored in the payload's first word.
    ///
    /// # Safety
    /// The slot must currently be free (not `USED`) and own at least a
    /// pointer-sized payload.
    #[inline]
    pub unsafe fn next_link(self) -> *mut u8 {
        unsafe { self.data_ptr().as_ptr().cast::<*mut u8>().read_unaligned() }
    }

    /// Overwrite the free-list `next` link stored in the payload's first
    /// word.
    ///
    /// # Safety
    /// The slot must currently be free (not `USED`) and own at least a
    /// pointer-sized payload.
    #[inline]
    pub unsafe fn set_next_link(self, next: *mut u8) {
        unsafe {
            self.data_ptr()
                .as_ptr()
                .cast::<*mut u8>()
                .write_unaligned(next)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        let word = pack(128, SlotFlags::USED);
        assert_eq!(unpack_size(word), 128);
        assert_eq!(unpack_flags(word), SlotFlags::USED);
    }

    #[test]
    fn huge_and_used_can_combine() {
        let word = pack(4096, SlotFlags::USED | SlotFlags::HUGE);
        assert_eq!(unpack_size(word), 4096);
        assert!(unpack_flags(word).contains(SlotFlags::USED));
        assert!(unpack_flags(word).contains(SlotFlags::HUGE));
    }

    #[test]
    fn write_guards_and_read_back() {
        let mut buf = [0u8; 64];
        let base = NonNull::new(buf.as_mut_ptr()).unwrap();
        let slot = unsafe { Slot::from_header(base) };
        unsafe {
            slot.write_guards(16, SlotFlags::empty());
            assert_eq!(slot.head(), slot.foot(16));
            assert_eq!(unpack_size(slot.head()), 16);
        }
    }

    #[test]
    fn free_list_link_round_trips_through_payload() {
        let mut buf = [0u8; 64];
        let base = NonNull::new(buf.as_mut_ptr()).unwrap();
        let slot = unsafe { Slot::from_header(base) };
        let sentinel: *mut u8 = 0x1234 as *mut u8;
        unsafe {
            slot.write_guards(32, SlotFlags::empty());
            slot.set_next_link(sentinel);
            assert_eq!(slot.next_link(), sentinel);
        }
    }

    #[test]
    fn from_data_ptr_recovers_header() {
        let mut buf = [0u8; 64];
        let base = NonNull::new(buf.as_mut_ptr()).unwrap();
        let slot = unsafe { Slot::from_header(base) };
        let recovered = unsafe { Slot::from_data_ptr(slot.data_ptr()) };
        assert_eq!(recovered.header_ptr(), slot.header_ptr());
    }
}
