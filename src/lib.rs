//! # genpool
//!
//! Process-wide generational memory pools with thread-local bump allocation
//! and coordinated bulk release:
//!
//! - **Pools**: up to [`MAX_POOLS`](config::MAX_POOLS) independent arena
//!   families, each identified by a small integer id
//! - **Thread-local arenas**: every (thread, pool, generation) triple owns a
//!   private bump arena, so steady-state allocation takes no locks
//! - **Two generations**: a front/back arena pair per slot; scratch memory
//!   goes to the back and dies at the next GC
//! - **Generational GC**: a user copy hook migrates live data into the fresh
//!   generation before the prior one is released in bulk
//! - **Asynchronous destruction**: any thread may release arenas created on
//!   every other thread, without per-allocation locking
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                           GENPOOL                             │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  ┌────────────┐   ┌──────────────┐   ┌────────────────────┐   │
//! │  │    Pool    │   │ GC Coordin.  │   │  Pool-ID Registry  │   │
//! │  │ (pool.rs)  │   │   (gc.rs)    │   │    (pool_id.rs)    │   │
//! │  └────────────┘   └──────────────┘   └────────────────────┘   │
//! │        │                  │                                   │
//! │        └────────┬─────────┘                                   │
//! │                 │                                             │
//! │  ┌──────────────────────────┐   ┌──────────────────────────┐  │
//! │  │   Per-Thread Slot Table  │   │        Bump Arena        │  │
//! │  │  + Table Registry        │──▶│        (arena.rs)        │  │
//! │  │        (slots.rs)        │   └──────────────────────────┘  │
//! │  └──────────────────────────┘                                 │
//! │                                                               │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Contract
//!
//! Individual frees do not exist: dropping a value constructed in pool
//! memory runs no destructor and returns no bytes. Memory comes back in
//! bulk, at [`Pool::gc`], [`Pool::clean`] or pool drop. GC is a coordinated
//! phase: the caller must ensure no thread allocates on the pool while its
//! `gc()` runs; the library does not detect violations.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod arena;
pub mod config;
pub mod error;
pub mod pool;
pub mod typed;

mod gc;
mod pool_id;
mod slots;

// Re-exports
pub use adapter::PoolAllocator;
pub use arena::Arena;
pub use config::{ArenaConfig, MAX_POOLS};
pub use error::PoolError;
pub use pool::Pool;
pub use typed::drop_in_place;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
