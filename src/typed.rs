//! # Typed Construction Layer
//!
//! Thin composition over the byte-level allocator: take a type's layout,
//! allocate, construct in place, return a typed pointer. Destruction runs
//! destructors only; pool memory is reclaimed in bulk, never per object.
//!
//! Values constructed here are NOT dropped by the pool. If a type owns
//! resources (heap buffers, handles), run [`drop_in_place`] on it before the
//! generation holding it is drained, or migrate it in the copy hook.

use std::alloc::Layout;
use std::ptr::{self, NonNull};

use crate::pool::Pool;

impl Pool {
    /// Move `value` into current-generation pool memory and return a typed
    /// pointer to it.
    ///
    /// The pointee is valid until this pool's current generation is next
    /// drained. The pool never runs `T`'s destructor.
    pub fn alloc<T>(&self, value: T) -> NonNull<T> {
        let layout = Layout::new::<T>();
        let raw = self.allocate(layout.size(), layout.align()).cast::<T>();
        // SAFETY: raw is valid for writes of T: freshly allocated with T's
        // size and alignment.
        unsafe { ptr::write(raw.as_ptr(), value) };
        raw
    }

    /// Move `value` into opposite-generation (temporary) pool memory.
    pub fn alloc_temp<T>(&self, value: T) -> NonNull<T> {
        let layout = Layout::new::<T>();
        let raw = self
            .allocate_temporary(layout.size(), layout.align())
            .cast::<T>();
        // SAFETY: as in `alloc`.
        unsafe { ptr::write(raw.as_ptr(), value) };
        raw
    }

    /// Allocate a slice of `len` elements in the current generation,
    /// constructing element `i` with `f(i)` in index order.
    pub fn alloc_slice_with<T>(&self, len: usize, f: impl FnMut(usize) -> T) -> NonNull<[T]> {
        let layout = Layout::array::<T>(len).expect("slice layout overflows usize");
        let raw = self.allocate(layout.size(), layout.align()).cast::<T>();
        fill_slice(raw, len, f)
    }

    /// Temporary-generation variant of [`Pool::alloc_slice_with`].
    pub fn alloc_slice_temp_with<T>(&self, len: usize, f: impl FnMut(usize) -> T) -> NonNull<[T]> {
        let layout = Layout::array::<T>(len).expect("slice layout overflows usize");
        let raw = self
            .allocate_temporary(layout.size(), layout.align())
            .cast::<T>();
        fill_slice(raw, len, f)
    }
}

fn fill_slice<T>(raw: NonNull<T>, len: usize, mut f: impl FnMut(usize) -> T) -> NonNull<[T]> {
    for i in 0..len {
        // SAFETY: i < len, and raw points to an allocation of len elements.
        unsafe { ptr::write(raw.as_ptr().add(i), f(i)) };
    }
    NonNull::slice_from_raw_parts(raw, len)
}

/// Run `T`'s destructor in place. Does NOT release pool memory; the bytes
/// return only at the next drain of their generation.
///
/// # Safety
///
/// `ptr` must point to a live, initialized `T` in pool memory that has not
/// been dropped before, and no one may use the value afterwards.
pub unsafe fn drop_in_place<T>(ptr: NonNull<T>) {
    // SAFETY: forwarded contract.
    unsafe { ptr::drop_in_place(ptr.as_ptr()) }
}
