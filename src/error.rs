//! `PoolError` and the `checked_*` convenience wrappers.
//!
//! The raw `Pool` API (`alloc`/`calloc`/`create`) keeps its
//! null-is-the-only-failure-channel contract untouched. This module is a
//! thin, additive `Result`-shaped layer on top for callers who'd rather not
//! hand-check pointers for null.

use core::ptr::NonNull;

use crate::constants::MAX_ALLOC;
use crate::pool::Pool;

/// Errors surfaced by the `checked_*` wrapper API. Never constructed by the
/// raw `Pool` methods.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The backing allocator failed to supply a pool object or a slab.
    #[error("backing allocator failed to satisfy the request")]
    OutOfMemory,

    /// The requested size exceeds `MAX_ALLOC`.
    #[error("requested size {requested} exceeds the maximum allocation size {max}")]
    SizeTooLarge { requested: usize, max: usize },

    /// A slot's guard words failed to match, or `USED` was clear, during
    /// `free`. Never returned by `checked_alloc`/`checked_calloc` — `free`
    /// stays infallible and handles corruption via its own policy
    /// (`sigsegv-on-corruption` feature); this variant exists for callers
    /// building their own corruption-reporting layer on top.
    #[error("slot guard corruption detected: {reason}")]
    Corruption { reason: &'static str },
}

impl Pool {
    /// `Pool::create`, translating backing-allocator failure into
    /// `PoolError::OutOfMemory`.
    pub fn checked_create() -> Result<Box<Pool>, PoolError> {
        Pool::create().ok_or(PoolError::OutOfMemory)
    }

    /// `Pool::alloc`, translating a null result into the matching
    /// `PoolError` variant.
    pub fn checked_alloc(&mut self, size: usize) -> Result<NonNull<u8>, PoolError> {
        if size > MAX_ALLOC {
            return Err(PoolError::SizeTooLarge {
                requested: size,
                max: MAX_ALLOC,
            });
        }
        NonNull::new(self.alloc(size)).ok_or(PoolError::OutOfMemory)
    }

    /// `Pool::calloc`, translating a null result into the matching
    /// `PoolError` variant.
    pub fn checked_calloc(&mut self, size: usize) -> Result<NonNull<u8>, PoolError> {
        if size > MAX_ALLOC {
            return Err(PoolError::SizeTooLarge {
                requested: size,
                max: MAX_ALLOC,
            });
        }
        NonNull::new(self.calloc(size)).ok_or(PoolError::OutOfMemory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_alloc_rejects_oversize_with_typed_error() {
        let mut pool = Pool::checked_create().unwrap();
        let err = pool.checked_alloc(MAX_ALLOC + 1).unwrap_err();
        assert_eq!(
            err,
            PoolError::SizeTooLarge {
                requested: MAX_ALLOC + 1,
                max: MAX_ALLOC
            }
        );
    }

    #[test]
    fn checked_alloc_succeeds_for_normal_size() {
        let mut pool = Pool::checked_create().unwrap();
        let ptr = pool.checked_alloc(32).unwrap();
        pool.free(ptr.as_ptr());
    }
}
