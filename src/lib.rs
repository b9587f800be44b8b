//! A pool-based slab allocator for workloads that repeatedly allocate and
//! free many small, similarly-sized objects within a bounded scope —
//! request handling, parser arenas, per-connection state.
//!
//! A [`Pool`] amortizes calls into the process allocator by acquiring
//! large chunks ("slabs"), carving them into fixed-size slots grouped into
//! size bins, and returning slots to a free list on [`Pool::free`]. Pools
//! support a soft [`Pool::reset`] (reclaim every live allocation, retain
//! slabs for reuse) and [`Pool::destroy`] (release everything).
//!
//! There is no cross-pool sharing, no coalescing of adjacent free slots,
//! and no best-fit search within a bin — frees are strictly LIFO. A slot
//! larger than the largest bin ("huge") is stored one-per-slab and bypasses
//! bins entirely.
//!
//! Enable the `thread-safe` feature for [`shared::SharedPool`], a
//! mutex-wrapped `Pool` usable from multiple threads. Enable
//! `sigsegv-on-corruption` to make [`Pool::free`] raise `SIGSEGV`
//! synchronously when it detects a corrupted guard pair, instead of
//! logging and dropping the free.

pub mod constants;
pub mod error;
pub mod pool;
mod slab;
mod slot;
mod sys;

#[cfg(feature = "thread-safe")]
pub mod shared;


pub use constants::{ALIGN, BINS, BIN_SHIFT, MAX_ALLOC, MIN_ALLOC, SLAB_MUL};
pub use error::PoolError;
pub use pool::Pool;

#[cfg(feature = "thread-safe")]
pub use shared::SharedPool;
