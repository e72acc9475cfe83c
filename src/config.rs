//! Build-time limits and arena sizing configuration.

/// Upper bound on concurrently-live pools.
///
/// Every participating thread owns a slot table with exactly this many
/// entries, so the bound is a compile-time constant rather than a runtime
/// knob: raising it costs a pointer pair per thread per slot.
pub const MAX_POOLS: usize = 64;

/// Sizing parameters for the per-thread bump arenas of a pool.
///
/// Blocks grow geometrically (doubling) from `initial_block_size` up to
/// `max_block_size`; a request larger than the next block size gets a
/// dedicated block. The defaults favour small pools that stay cheap until
/// first touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Size in bytes of the first block of each arena.
    /// Default: one OS page.
    pub initial_block_size: usize,

    /// Ceiling in bytes for the geometric block growth.
    /// Default: 4 MB (4194304 bytes).
    pub max_block_size: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_block_size: crate::arena::page_size(),
            max_block_size: 4 * 1024 * 1024, // 4 MB
        }
    }
}

impl ArenaConfig {
    /// Clamp the configuration to usable values: a non-trivial initial block
    /// and a ceiling no smaller than the initial block.
    pub(crate) fn normalized(self) -> Self {
        let initial_block_size = self.initial_block_size.max(64);
        Self {
            initial_block_size,
            max_block_size: self.max_block_size.max(initial_block_size),
        }
    }
}
