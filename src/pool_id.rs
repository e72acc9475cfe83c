//! # Pool-ID Registry
//!
//! Process-wide allocator for the bounded namespace of pool identifiers
//! `0..MAX_POOLS`. Identifiers are handed out smallest-first so that
//! long-running processes with pool churn keep the per-thread slot tables
//! densely populated near index 0.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::config::MAX_POOLS;
use crate::error::PoolError;

/// Identifier of a live pool, in `0..MAX_POOLS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PoolId(u32);

impl PoolId {
    pub(crate) fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

struct IdSets {
    /// `live[i]` iff id `i` is currently owned by a pool.
    live: [bool; MAX_POOLS],
    /// Ids available for the next acquire, smallest first.
    free: BTreeSet<u32>,
}

/// Mutex-guarded {live set, free set} over the id namespace.
///
/// Invariant: `|live| + |free| == MAX_POOLS` at every quiescent point.
pub(crate) struct PoolIdRegistry {
    inner: Mutex<IdSets>,
}

impl PoolIdRegistry {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(IdSets {
                live: [false; MAX_POOLS],
                free: (0..MAX_POOLS as u32).collect(),
            }),
        }
    }

    /// Pop the smallest free id and mark it live.
    pub(crate) fn acquire(&self) -> Result<PoolId, PoolError> {
        let mut sets = self.inner.lock();
        let id = sets
            .free
            .pop_first()
            .ok_or(PoolError::TooManyPools { max: MAX_POOLS })?;
        sets.live[id as usize] = true;
        Ok(PoolId(id))
    }

    /// Return `id` to the free set. Releasing an id that is not live is a
    /// no-op, so double-release is harmless.
    pub(crate) fn release(&self, id: PoolId) {
        let mut sets = self.inner.lock();
        if sets.live[id.index()] {
            sets.live[id.index()] = false;
            sets.free.insert(id.as_u32());
        }
    }

    #[cfg(test)]
    fn live_count(&self) -> usize {
        self.inner.lock().live.iter().filter(|&&l| l).count()
    }

    #[cfg(test)]
    fn free_count(&self) -> usize {
        self.inner.lock().free.len()
    }
}

/// Global id registry instance.
static POOL_IDS: OnceLock<PoolIdRegistry> = OnceLock::new();

/// Get the global id registry.
pub(crate) fn pool_ids() -> &'static PoolIdRegistry {
    POOL_IDS.get_or_init(PoolIdRegistry::new)
}
