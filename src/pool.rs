//! # Pool Object
//!
//! The user-facing handle over one arena family. A pool owns a small integer
//! id and a generation bit; the arenas themselves are owned by the threads
//! that allocate from them. Dropping the pool releases every thread's arenas
//! for its id and returns the id to the process-wide registry.
//!
//! # Example
//!
//! ```rust,ignore
//! use genpool::Pool;
//!
//! let pool = Pool::new()?;
//! let p = pool.allocate(64, 8);
//! // ... use p until the next gc()/clean() ...
//! pool.clean();
//! ```

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::config::ArenaConfig;
use crate::error::PoolError;
use crate::gc;
use crate::pool_id::{pool_ids, PoolId};
use crate::slots::{self, tables};

/// The user copy procedure invoked during [`Pool::gc`].
pub(crate) type CopyHook = Box<dyn FnMut() + Send>;

/// A handle to one independent family of per-thread, two-generation arenas.
///
/// Allocation is thread-local and lock-free after the first touch per
/// (thread, generation); any thread may bulk-release the whole family via
/// [`Pool::clean`] or [`Pool::gc`].
///
/// # GC preconditions
///
/// `gc`, `clean` and `clean_temporary` must not run concurrently with
/// allocations on the same pool (see the method docs for the exact rules).
/// The library does not detect violations; the result is undefined.
pub struct Pool {
    id: PoolId,
    /// Current generation bit. Flipped only inside `gc()`; Acquire-loaded on
    /// every allocation.
    cur_gen: AtomicUsize,
    copy_hook: Mutex<Option<CopyHook>>,
    config: ArenaConfig,
}

impl Pool {
    /// Create a pool with default arena sizing.
    ///
    /// Fails with [`PoolError::TooManyPools`] when all
    /// [`MAX_POOLS`](crate::config::MAX_POOLS) ids are live.
    pub fn new() -> Result<Self, PoolError> {
        Self::with_config(ArenaConfig::default())
    }

    /// Create a pool whose per-thread arenas use the given block sizing.
    pub fn with_config(config: ArenaConfig) -> Result<Self, PoolError> {
        let id = pool_ids().acquire()?;
        Ok(Self {
            id,
            cur_gen: AtomicUsize::new(0),
            copy_hook: Mutex::new(None),
            config: config.normalized(),
        })
    }

    /// This pool's id, in `0..MAX_POOLS`.
    pub fn id(&self) -> u32 {
        self.id.as_u32()
    }

    /// The current generation bit (0 or 1). Flips at every [`Pool::gc`] that
    /// runs a copy hook.
    pub fn generation(&self) -> u32 {
        self.cur_gen.load(Ordering::Acquire) as u32
    }

    /// Allocate `size` bytes at `align` from the calling thread's
    /// current-generation arena, creating the arena on first touch.
    ///
    /// Never returns null; system-allocator refusal aborts the process.
    /// The pointer is valid until this pool's memory is next drained (the
    /// second GC from now, or the next `clean`).
    pub fn allocate(&self, size: usize, align: usize) -> NonNull<u8> {
        let gen = self.cur_gen.load(Ordering::Acquire);
        slots::with_local_arena(self.id, gen, self.config, |arena| {
            arena.allocate(size, align)
        })
    }

    /// Allocate scratch memory from the opposite-generation arena.
    ///
    /// Temporary allocations are reclaimed at the next GC without entering
    /// the copy hook's reachable set, and by [`Pool::clean_temporary`].
    pub fn allocate_temporary(&self, size: usize, align: usize) -> NonNull<u8> {
        let gen = 1 - self.cur_gen.load(Ordering::Acquire);
        slots::with_local_arena(self.id, gen, self.config, |arena| {
            arena.allocate(size, align)
        })
    }

    /// Release a single allocation. A no-op, kept for API symmetry with
    /// [`Pool::allocate`]: pool memory returns only in bulk at GC, `clean`
    /// or shutdown.
    pub fn free(&self, _ptr: NonNull<u8>) {}

    /// Register the copy procedure invoked during [`Pool::gc`] to migrate
    /// live data into the new generation. Replaces any previous hook.
    ///
    /// The hook runs after the generation flip, so its `allocate` calls land
    /// in the fresh generation; it is expected to drop every reference to
    /// old-generation memory before returning.
    pub fn register_copy_hook(&self, hook: impl FnMut() + Send + 'static) {
        *self.copy_hook.lock() = Some(Box::new(hook));
    }

    /// Run one GC cycle: drain the temporary generation, flip, run the copy
    /// hook, drain the prior generation.
    ///
    /// With no registered hook this collapses to [`Pool::clean`] (both
    /// drains, no flip). A panicking hook is re-raised only after the prior
    /// generation has been drained, so the old generation never leaks.
    ///
    /// Precondition: no thread is allocating on this pool for the duration
    /// of the call.
    pub fn gc(&self) {
        gc::collect(self);
    }

    /// Drain both generations across every thread for this pool.
    ///
    /// Precondition: no thread is allocating on this pool.
    pub fn clean(&self) {
        gc::drain(self.id, 0);
        gc::drain(self.id, 1);
    }

    /// Drain every thread's opposite-generation arena for this pool.
    ///
    /// Precondition: no thread is calling [`Pool::allocate_temporary`] on
    /// this pool.
    pub fn clean_temporary(&self) {
        let gen = 1 - self.cur_gen.load(Ordering::Acquire);
        gc::drain(self.id, gen);
    }

    /// Bytes currently handed out across all threads and both generations.
    pub fn bytes_in_use(&self) -> usize {
        let mut total = 0;
        tables().for_each(|table| {
            for gen in 0..2 {
                if let Some(arena) = table.advertised(self.id, gen) {
                    total += arena.bytes_in_use();
                }
            }
        });
        total
    }

    /// Bytes currently handed out across all threads in the temporary
    /// (opposite) generation only.
    pub fn temporary_bytes_in_use(&self) -> usize {
        let gen = 1 - self.cur_gen.load(Ordering::Acquire);
        let mut total = 0;
        tables().for_each(|table| {
            if let Some(arena) = table.advertised(self.id, gen) {
                total += arena.bytes_in_use();
            }
        });
        total
    }

    pub(crate) fn pool_id(&self) -> PoolId {
        self.id
    }

    pub(crate) fn generation_index(&self) -> usize {
        self.cur_gen.load(Ordering::Acquire)
    }

    pub(crate) fn set_generation_index(&self, gen: usize) {
        self.cur_gen.store(gen, Ordering::Release);
    }

    pub(crate) fn hook_slot(&self) -> &Mutex<Option<CopyHook>> {
        &self.copy_hook
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.clean();
        pool_ids().release(self.id);
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id())
            .field("generation", &self.generation())
            .finish()
    }
}
