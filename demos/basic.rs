//! Minimal end-to-end walkthrough: allocate a handful of same-size
//! objects, free them out of order, reset the pool, and allocate again —
//! demonstrating that a soft reset retains the backing slab.

use slotpool::Pool;

fn main() {
    tracing_subscriber::fmt::init();

    let mut pool = Pool::create().expect("backing allocator should have room for one pool");

    let handles: Vec<*mut u8> = (0..4).map(|_| pool.calloc(32)).collect();
    for h in &handles {
        assert!(!h.is_null());
    }

    // Free in reverse order; the next four allocations come back LIFO.
    for &h in handles.iter().rev() {
        pool.free(h);
    }

    pool.reset();
    let reused = pool.alloc(32);
    assert!(!reused.is_null());
    pool.free(reused);

    pool.destroy();
}
