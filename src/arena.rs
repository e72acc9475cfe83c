//! # Bump Arena
//!
//! A monotonic buffer that hands out aligned byte ranges from a chain of
//! growing backing blocks. Allocation bumps a cursor; memory is reclaimed
//! only in bulk by [`Arena::reset`].
//!
//! ## Ownership and threads
//!
//! An arena is owned by exactly one thread, which is the only thread that
//! allocates from it. During a pool-wide drain, a *coordinating* thread may
//! call [`Arena::reset`] on arenas owned by other threads; the coordination
//! protocol guarantees the owner is not allocating at that moment. The
//! cursor fields are atomics so that this cross-thread reset is a protocol
//! violation at worst, never a data race, and the block list itself is
//! mutex-guarded.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::config::ArenaConfig;

/// Alignment of block base addresses. Requests with larger alignment are
/// satisfied by over-allocating and aligning the cursor.
const BLOCK_ALIGN: usize = 16;

/// Round `value` up to the nearest multiple of `align` (must be a power of 2).
fn round_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

#[cfg(unix)]
pub(crate) fn page_size() -> usize {
    // SAFETY: sysconf(_SC_PAGESIZE) is always safe and returns a positive value.
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

#[cfg(not(unix))]
pub(crate) fn page_size() -> usize {
    4096
}

/// One backing block of raw bytes.
struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Block {
    fn new(size: usize) -> Self {
        let layout = Layout::from_size_align(size, BLOCK_ALIGN).expect("block layout");
        // SAFETY: layout has non-zero size (callers request at least 64 bytes).
        let ptr = unsafe { alloc(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            handle_alloc_error(layout);
        };
        Self { ptr, layout }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by `alloc` with this exact layout.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

// A block's pointer is exclusively owned; nothing aliases it once the block
// is dropped.
unsafe impl Send for Block {}

/// A monotonic bump allocator over a chain of backing blocks.
///
/// `allocate` never returns null: if the system allocator refuses to grow
/// the arena, the process aborts via [`handle_alloc_error`]. Individual
/// frees do not exist; [`Arena::reset`] releases everything at once.
pub struct Arena {
    /// Base pointer of the block currently being bumped (null until the
    /// first allocation and after a reset).
    cur_base: AtomicPtr<u8>,
    /// Bump offset within the current block, in bytes.
    cur_off: AtomicUsize,
    /// Capacity of the current block, in bytes.
    cur_cap: AtomicUsize,
    /// Size of the next block to append.
    next_block_size: AtomicUsize,
    /// Bytes handed out since the last reset (requested sizes, not padding).
    bytes_in_use: AtomicUsize,
    /// All live blocks, most recently appended last.
    blocks: Mutex<Vec<Block>>,
    config: ArenaConfig,
}

impl Arena {
    /// Create an empty arena. No memory is acquired until the first
    /// allocation.
    pub fn new(config: ArenaConfig) -> Self {
        let config = config.normalized();
        Self {
            cur_base: AtomicPtr::new(ptr::null_mut()),
            cur_off: AtomicUsize::new(0),
            cur_cap: AtomicUsize::new(0),
            next_block_size: AtomicUsize::new(config.initial_block_size),
            bytes_in_use: AtomicUsize::new(0),
            blocks: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Bump-allocate `size` bytes at the requested alignment.
    ///
    /// `align` must be a power of two. The returned pointer is valid until
    /// the next [`Arena::reset`]; writing through it after a reset is
    /// undefined behavior.
    pub fn allocate(&self, size: usize, align: usize) -> NonNull<u8> {
        debug_assert!(align.is_power_of_two());

        let base = self.cur_base.load(Ordering::Acquire);
        if !base.is_null() {
            let off = self.cur_off.load(Ordering::Acquire);
            let aligned = round_up(base as usize + off, align);
            let new_off = aligned - base as usize + size;
            if new_off <= self.cur_cap.load(Ordering::Acquire) {
                self.cur_off.store(new_off, Ordering::Release);
                self.bytes_in_use.fetch_add(size, Ordering::Relaxed);
                // SAFETY: [aligned, aligned + size) lies inside the current
                // block, which stays live until reset().
                return unsafe { NonNull::new_unchecked(aligned as *mut u8) };
            }
        }
        self.allocate_grow(size, align)
    }

    /// Slow path: append a block large enough for the request, then bump.
    #[cold]
    fn allocate_grow(&self, size: usize, align: usize) -> NonNull<u8> {
        let mut blocks = self.blocks.lock();

        // Over-allocate by the alignment so the aligned cursor always fits.
        let want = size
            .checked_add(align)
            .expect("allocation size overflows usize");
        let mut block_size = self.next_block_size.load(Ordering::Acquire);
        if block_size < want {
            block_size = round_up(want, page_size());
        }

        let block = Block::new(block_size);
        let base = block.ptr.as_ptr();
        let aligned = round_up(base as usize, align);
        let new_off = aligned - base as usize + size;
        blocks.push(block);

        self.cur_base.store(base, Ordering::Release);
        self.cur_cap.store(block_size, Ordering::Release);
        self.cur_off.store(new_off, Ordering::Release);
        let next = block_size
            .saturating_mul(2)
            .min(self.config.max_block_size)
            .max(self.config.initial_block_size);
        self.next_block_size.store(next, Ordering::Release);
        self.bytes_in_use.fetch_add(size, Ordering::Relaxed);
        // SAFETY: [aligned, aligned + size) lies inside the block just
        // pushed, which stays live until reset().
        unsafe { NonNull::new_unchecked(aligned as *mut u8) }
    }

    /// Release every backing block, returning the arena to its empty state.
    ///
    /// O(blocks). May be called from a thread other than the owner, provided
    /// the owner is not allocating concurrently (the GC coordination
    /// contract). All previously returned pointers become invalid.
    pub fn reset(&self) {
        let mut blocks = self.blocks.lock();
        self.cur_base.store(ptr::null_mut(), Ordering::Release);
        self.cur_off.store(0, Ordering::Release);
        self.cur_cap.store(0, Ordering::Release);
        self.next_block_size
            .store(self.config.initial_block_size, Ordering::Release);
        self.bytes_in_use.store(0, Ordering::Release);
        blocks.clear();
    }

    /// Bytes handed out since the last reset (requested sizes, excluding
    /// alignment padding).
    pub fn bytes_in_use(&self) -> usize {
        self.bytes_in_use.load(Ordering::Acquire)
    }

    /// Number of live backing blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("bytes_in_use", &self.bytes_in_use())
            .field("blocks", &self.block_count())
            .finish()
    }
}
