//! `SharedPool`: an opt-in mutex-wrapped `Pool` for cross-thread use.
//!
//! The lock sits next to the state it protects; every public entry point
//! acquires it and releases it on every exit path, including allocation
//! failure.

use crate::error::PoolError;
use crate::pool::Pool;
use core::ptr::NonNull;
use spin::Mutex;

/// A `Pool` behind a `spin::Mutex`. Every method locks on entry and
/// releases the lock on every return path, including failure.
pub struct SharedPool(Mutex<Pool>);

impl SharedPool {
    /// `Pool::create`, then wrap it in its mutex.
    pub fn create() -> Option<SharedPool> {
        Pool::create().map(|pool| Mutex::new(*pool)).map(SharedPool)
    }

    /// `Pool::checked_create`, then wrap it in its mutex.
    pub fn checked_create() -> Result<SharedPool, PoolError> {
        Pool::checked_create().map(|pool| Mutex::new(*pool)).map(SharedPool)
    }

    pub fn alloc(&self, size: usize) -> *mut u8 {
        self.0.lock().alloc(size)
    }

    pub fn calloc(&self, size: usize) -> *mut u8 {
        self.0.lock().calloc(size)
    }

    /// # Safety
    /// `data` must be a pointer this pool itself handed out and that has
    /// not already been freed.
    pub fn free(&self, data: *mut u8) {
        self.0.lock().free(data);
    }

    pub fn checked_alloc(&self, size: usize) -> Result<NonNull<u8>, PoolError> {
        self.0.lock().checked_alloc(size)
    }

    pub fn checked_calloc(&self, size: usize) -> Result<NonNull<u8>, PoolError> {
        self.0.lock().checked_calloc(size)
    }

    pub fn reset(&self) {
        self.0.lock().reset();
    }

    /// Hard reset and release everything. Consumes `self`.
    pub fn destroy(self) {
        self.0.into_inner().destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_alloc_free_does_not_corrupt_bins() {
        let pool = Arc::new(SharedPool::create().unwrap());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    let p = pool.alloc(32);
                    assert!(!p.is_null());
                    pool.free(p);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
