//! # Container-Allocator Adaptor
//!
//! [`PoolAllocator`] satisfies the [`allocator_api2`] `Allocator` trait over
//! a pool, so allocator-aware containers can live in pool memory. The
//! adaptor preserves the pool's central contract: `deallocate` is a no-op,
//! and bytes return only when the pool is drained.
//!
//! # Example
//!
//! ```rust,ignore
//! use allocator_api2::vec::Vec;
//! use genpool::{Pool, PoolAllocator};
//!
//! let pool = Pool::new()?;
//! let mut v: Vec<u32, _> = Vec::new_in(PoolAllocator::new(&pool));
//! v.push(7);
//! ```

use std::alloc::Layout;
use std::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};

use crate::pool::Pool;

/// An [`Allocator`] handle drawing from one generation of a [`Pool`].
#[derive(Clone, Copy, Debug)]
pub struct PoolAllocator<'a> {
    pool: &'a Pool,
    temporary: bool,
}

impl<'a> PoolAllocator<'a> {
    /// Allocator over the pool's current (default) generation.
    pub fn new(pool: &'a Pool) -> Self {
        Self {
            pool,
            temporary: false,
        }
    }

    /// Allocator over the pool's opposite (temporary) generation. Container
    /// contents are reclaimed at the next GC without entering the copy hook.
    pub fn temporary(pool: &'a Pool) -> Self {
        Self {
            pool,
            temporary: true,
        }
    }
}

unsafe impl Allocator for PoolAllocator<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            // SAFETY: align is non-zero, so the address is non-null; a
            // zero-length allocation is never dereferenced.
            let dangling = unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }
        let ptr = if self.temporary {
            self.pool.allocate_temporary(layout.size(), layout.align())
        } else {
            self.pool.allocate(layout.size(), layout.align())
        };
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        // Pool memory is reclaimed only in bulk at GC or shutdown.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocator_api2::vec::Vec;

    #[test]
    fn test_vec_in_pool() {
        let pool = Pool::new().unwrap();
        let mut v: Vec<u64, _> = Vec::new_in(PoolAllocator::new(&pool));
        for i in 0..256 {
            v.push(i);
        }
        assert_eq!(v.len(), 256);
        assert_eq!(v[255], 255);
        assert!(pool.bytes_in_use() >= 256 * 8);
    }

    #[test]
    fn test_deallocate_returns_nothing() {
        let pool = Pool::new().unwrap();
        {
            let mut v: Vec<u8, _> = Vec::new_in(PoolAllocator::new(&pool));
            for i in 0..1024 {
                v.push(i as u8);
            }
        }
        // The Vec is gone, the bytes are not: only a drain reclaims them.
        assert!(pool.bytes_in_use() >= 1024);
        pool.clean();
        assert_eq!(pool.bytes_in_use(), 0);
    }

    #[test]
    fn test_zero_size_allocation_is_dangling() {
        let pool = Pool::new().unwrap();
        let alloc = PoolAllocator::new(&pool);
        let layout = Layout::from_size_align(0, 16).unwrap();
        let slice = alloc.allocate(layout).unwrap();
        assert_eq!(slice.len(), 0);
        assert_eq!(pool.bytes_in_use(), 0);
    }

    #[test]
    fn test_temporary_allocator_uses_opposite_generation() {
        let pool = Pool::new().unwrap();
        let mut v: Vec<u32, _> = Vec::new_in(PoolAllocator::temporary(&pool));
        for i in 0..64 {
            v.push(i);
        }
        assert!(pool.temporary_bytes_in_use() >= 64 * 4);
        drop(v);
        pool.clean_temporary();
        assert_eq!(pool.temporary_bytes_in_use(), 0);
    }
}
