//! # GC Coordinator
//!
//! The generation-flip sequence for one pool:
//!
//! 1. drain the temporary (opposite) generation across all threads,
//! 2. flip the pool's generation bit,
//! 3. run the registered copy hook; its allocations now land in the fresh
//!    generation,
//! 4. drain the prior generation across all threads.
//!
//! Hook-less GC skips the flip and performs both drains, which is exactly
//! `clean()`. A panicking hook is caught, the prior generation is drained
//! anyway, and the panic is re-raised to the `gc()` caller.

use std::panic::{self, AssertUnwindSafe};

use crate::pool::Pool;
use crate::pool_id::PoolId;
use crate::slots::tables;

/// Reset every thread's arena for `(id, gen)`.
///
/// Runs under the table-registry lock; arena reset is infallible.
pub(crate) fn drain(id: PoolId, gen: usize) {
    tables().for_each(|table| {
        if let Some(arena) = table.advertised(id, gen) {
            arena.reset();
        }
    });
}

/// One GC cycle on `pool`. Caller guarantees no concurrent allocation on
/// this pool.
pub(crate) fn collect(pool: &Pool) {
    let id = pool.pool_id();
    let old_gen = pool.generation_index();

    let hook = pool.hook_slot().lock().take();
    let Some(mut hook) = hook else {
        drain(id, 1 - old_gen);
        drain(id, old_gen);
        return;
    };

    drain(id, 1 - old_gen);
    pool.set_generation_index(1 - old_gen);

    // The hook slot is released while the hook runs, so the hook itself may
    // allocate or re-register.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| hook()));

    drain(id, old_gen);

    let mut slot = pool.hook_slot().lock();
    if slot.is_none() {
        *slot = Some(hook);
    }
    drop(slot);

    if let Err(payload) = outcome {
        panic::resume_unwind(payload);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::pool::Pool;

    #[test]
    fn test_gc_without_hook_cleans_everything() {
        let pool = Pool::new().unwrap();
        pool.allocate(4096, 8);
        pool.allocate_temporary(2048, 8);
        pool.gc();
        assert_eq!(pool.bytes_in_use(), 0);
        assert_eq!(pool.generation(), 0, "hook-less GC must not flip");
    }

    #[test]
    fn test_gc_with_hook_flips_generation() {
        let pool = Pool::new().unwrap();
        pool.register_copy_hook(|| {});
        assert_eq!(pool.generation(), 0);
        pool.gc();
        assert_eq!(pool.generation(), 1);
        pool.gc();
        assert_eq!(pool.generation(), 0);
    }

    #[test]
    fn test_hook_runs_every_cycle() {
        let pool = Pool::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        pool.register_copy_hook(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        pool.gc();
        pool.gc();
        pool.gc();
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_hook_allocations_survive_the_cycle() {
        let pool = Arc::new(Pool::new().unwrap());
        let p = pool.allocate(8, 8).cast::<u64>();
        unsafe { p.as_ptr().write(41) };
        let old_addr = p.as_ptr() as usize;

        let hook_pool = Arc::clone(&pool);
        let copied = Arc::new(AtomicUsize::new(0));
        let copied_out = Arc::clone(&copied);
        pool.register_copy_hook(move || {
            let old = unsafe { (old_addr as *const u64).read() };
            let fresh = hook_pool.allocate(8, 8).cast::<u64>();
            unsafe { fresh.as_ptr().write(old + 1) };
            copied_out.store(fresh.as_ptr() as usize, Ordering::Relaxed);
        });

        pool.gc();

        let fresh = copied.load(Ordering::Relaxed) as *const u64;
        assert_eq!(unsafe { fresh.read() }, 42);
        // Only the copy remains live.
        assert_eq!(pool.bytes_in_use(), 8);

        // Break the pool -> hook -> pool cycle before dropping.
        pool.register_copy_hook(|| {});
    }

    #[test]
    fn test_panicking_hook_still_drains_old_generation() {
        let pool = Pool::new().unwrap();
        pool.allocate(1024, 8);
        pool.register_copy_hook(|| panic!("copy failed"));

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pool.gc()));
        assert!(outcome.is_err());
        assert_eq!(pool.bytes_in_use(), 0, "old generation must not leak");
        assert_eq!(pool.generation(), 1, "flip happened before the hook ran");
    }

    #[test]
    fn test_temporary_memory_never_enters_new_generation() {
        let pool = Pool::new().unwrap();
        pool.allocate_temporary(512, 8);
        pool.register_copy_hook(|| {});
        pool.gc();
        assert_eq!(pool.bytes_in_use(), 0);
        assert_eq!(pool.temporary_bytes_in_use(), 0);
    }
}
