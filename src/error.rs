//! Pool error types.

use thiserror::Error;

/// Errors surfaced by pool construction.
///
/// Arena growth failure is deliberately absent: the allocation contract is
/// non-nullable, and a refusal from the system allocator aborts via
/// [`std::alloc::handle_alloc_error`]. All `clean` operations are infallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every pool id is currently live. Recoverable by dropping a pool.
    #[error("too many pools: all {max} pool ids are live")]
    TooManyPools {
        /// The build-time pool limit ([`crate::config::MAX_POOLS`]).
        max: usize,
    },
}
