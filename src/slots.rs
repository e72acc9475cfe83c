//! # Per-Thread Slot Tables
//!
//! Each participating thread lazily creates one [`SlotTable`]: a fixed array
//! of `MAX_POOLS` generation pairs, each pair holding up to two arenas (one
//! per generation). The table registers itself in a process-wide registry at
//! construction and unregisters at thread exit, so a coordinating thread can
//! visit every thread's arena for a given (pool, generation) during a drain.
//!
//! The arena handle in a slot is an `AtomicPtr`: the owning thread
//! Release-stores it once at creation, which is the advertisement that lets
//! other threads Acquire-load it and reset the arena during GC.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::arena::Arena;
use crate::config::{ArenaConfig, MAX_POOLS};
use crate::pool_id::PoolId;

/// The two arena handles of one (thread, pool) slot, indexed by generation.
pub(crate) struct GenerationPair {
    arenas: [AtomicPtr<Arena>; 2],
    /// Serializes first-time arena creation per slot. Never taken on the
    /// allocation fast path.
    init: Mutex<()>,
}

impl GenerationPair {
    fn new() -> Self {
        Self {
            arenas: [
                AtomicPtr::new(ptr::null_mut()),
                AtomicPtr::new(ptr::null_mut()),
            ],
            init: Mutex::new(()),
        }
    }

    /// The arena for `gen`, creating it on first touch.
    fn arena(&self, gen: usize, config: ArenaConfig) -> &Arena {
        let p = self.arenas[gen].load(Ordering::Acquire);
        if !p.is_null() {
            // SAFETY: a non-null handle points to an arena that lives until
            // this table is destroyed, which cannot happen while the owning
            // thread is inside this call.
            return unsafe { &*p };
        }
        self.create_arena(gen, config)
    }

    #[cold]
    fn create_arena(&self, gen: usize, config: ArenaConfig) -> &Arena {
        let _guard = self.init.lock();
        let p = self.arenas[gen].load(Ordering::Acquire);
        if !p.is_null() {
            // SAFETY: as in `arena` above.
            return unsafe { &*p };
        }
        let fresh = Box::into_raw(Box::new(Arena::new(config)));
        self.arenas[gen].store(fresh, Ordering::Release);
        // SAFETY: `fresh` was just leaked from a Box and is owned by this
        // slot until table destruction.
        unsafe { &*fresh }
    }

    /// The advertised arena for `gen`, if one was ever created.
    fn advertised(&self, gen: usize) -> Option<&Arena> {
        let p = self.arenas[gen].load(Ordering::Acquire);
        // SAFETY: non-null handles stay valid for the table's lifetime, and
        // callers only reach this table through the registry lock, which
        // blocks the owner's unregister-and-destroy until they are done.
        (!p.is_null()).then(|| unsafe { &*p })
    }
}

/// A thread's fixed-size table of generation pairs, one entry per pool id.
pub(crate) struct SlotTable {
    slots: [GenerationPair; MAX_POOLS],
}

impl SlotTable {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| GenerationPair::new()),
        }
    }

    pub(crate) fn arena(&self, id: PoolId, gen: usize, config: ArenaConfig) -> &Arena {
        self.slots[id.index()].arena(gen, config)
    }

    pub(crate) fn advertised(&self, id: PoolId, gen: usize) -> Option<&Arena> {
        self.slots[id.index()].advertised(gen)
    }
}

impl Drop for SlotTable {
    fn drop(&mut self) {
        for slot in &self.slots {
            for handle in &slot.arenas {
                let p = handle.swap(ptr::null_mut(), Ordering::AcqRel);
                if !p.is_null() {
                    // SAFETY: the handle was created by Box::into_raw in
                    // create_arena and is dropped exactly once, here. The
                    // table has already been unregistered, so no other
                    // thread can reach it.
                    drop(unsafe { Box::from_raw(p) });
                }
            }
        }
    }
}

/// Registry entry. Dereferenced only while the registry lock is held; a
/// table is removed from the registry before it is freed.
struct TablePtr(*const SlotTable);

unsafe impl Send for TablePtr {}

/// Process-wide set of live slot-table addresses.
pub(crate) struct TableRegistry {
    tables: Mutex<Vec<TablePtr>>,
}

impl TableRegistry {
    fn new() -> Self {
        Self {
            tables: Mutex::new(Vec::new()),
        }
    }

    fn insert(&self, table: *const SlotTable) {
        self.tables.lock().push(TablePtr(table));
    }

    fn remove(&self, table: *const SlotTable) {
        self.tables.lock().retain(|entry| entry.0 != table);
    }

    /// Visit every live table while holding the registry lock. Visitors must
    /// be short: thread entry and exit block on this lock.
    pub(crate) fn for_each(&self, mut visitor: impl FnMut(&SlotTable)) {
        let tables = self.tables.lock();
        for entry in tables.iter() {
            // SAFETY: the entry's table has not been destroyed: unregistering
            // requires this lock, which we hold.
            visitor(unsafe { &*entry.0 });
        }
    }
}

/// Global table registry instance.
static TABLES: OnceLock<TableRegistry> = OnceLock::new();

/// Get the global table registry.
pub(crate) fn tables() -> &'static TableRegistry {
    TABLES.get_or_init(TableRegistry::new)
}

/// Thread-local owner of a [`SlotTable`]. Registers at construction,
/// unregisters (under the registry lock) and frees every arena at thread
/// exit.
struct ThreadTable {
    table: Box<SlotTable>,
}

impl ThreadTable {
    fn new() -> Self {
        let table = Box::new(SlotTable::new());
        tables().insert(&*table);
        Self { table }
    }
}

impl Drop for ThreadTable {
    fn drop(&mut self) {
        // Remove first: once this returns, no drain can be holding a
        // reference into the table, and none can acquire one. The arenas are
        // then freed by SlotTable::drop.
        tables().remove(&*self.table);
    }
}

thread_local! {
    static THREAD_TABLE: ThreadTable = ThreadTable::new();
}

/// Run `f` on the calling thread's arena for `(id, gen)`, creating the
/// arena on first touch.
pub(crate) fn with_local_arena<R>(
    id: PoolId,
    gen: usize,
    config: ArenaConfig,
    f: impl FnOnce(&Arena) -> R,
) -> R {
    THREAD_TABLE.with(|t| f(t.table.arena(id, gen, config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool_id::pool_ids;

    #[test]
    fn test_lazy_creation_and_stability() {
        let id = pool_ids().acquire().unwrap();
        let config = ArenaConfig::default();

        let first = with_local_arena(id, 0, config, |a| a as *const Arena);
        let second = with_local_arena(id, 0, config, |a| a as *const Arena);
        assert_eq!(first, second);

        let other_gen = with_local_arena(id, 1, config, |a| a as *const Arena);
        assert_ne!(first, other_gen);

        pool_ids().release(id);
    }

    #[test]
    fn test_advertised_visible_through_registry() {
        let id = pool_ids().acquire().unwrap();
        let config = ArenaConfig::default();

        let local = with_local_arena(id, 0, config, |a| {
            a.allocate(32, 8);
            a as *const Arena
        });

        let mut seen = false;
        tables().for_each(|table| {
            if let Some(arena) = table.advertised(id, 0) {
                if arena as *const Arena == local {
                    seen = true;
                    assert_eq!(arena.bytes_in_use(), 32);
                }
            }
        });
        assert!(seen);

        // Leave no bytes behind for other tests.
        with_local_arena(id, 0, config, |a| a.reset());
        pool_ids().release(id);
    }

    #[test]
    fn test_thread_exit_unregisters_table() {
        let id = pool_ids().acquire().unwrap();
        let config = ArenaConfig::default();

        let remote = std::thread::spawn(move || {
            with_local_arena(id, 0, config, |a| {
                a.allocate(64, 8);
                a as *const Arena as usize
            })
        })
        .join()
        .unwrap();

        // The exited thread's table (and its arenas) must be gone.
        tables().for_each(|table| {
            if let Some(arena) = table.advertised(id, 0) {
                assert_ne!(arena as *const Arena as usize, remote);
            }
        });
        pool_ids().release(id);
    }
}
