//! Cache-aligned raw buffers and typed aligned arrays.
//!
//! Backing storage for the AD arena blocks and for the optimizer's packed
//! vectors and matrices. Allocation failure is fatal: it is routed to
//! [`std::alloc::handle_alloc_error`], which aborts.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::float::Float;

/// Alignment for all raw allocations. Cache-line sized, which also covers
/// every SIMD lane width in use.
pub const CACHE_ALIGN: usize = 64;

fn cache_layout(size: usize) -> Layout {
    // size is always a small multiple of the cache line here, so the only
    // failure mode (overflow) cannot occur.
    Layout::from_size_align(size, CACHE_ALIGN).unwrap()
}

/// Allocate `size` zeroed bytes at cache-line alignment. Aborts on failure.
pub fn cache_aligned_alloc(size: usize) -> NonNull<u8> {
    let layout = cache_layout(size);
    // SAFETY: `size` is non-zero for every caller in this crate.
    let ptr = unsafe { alloc_zeroed(layout) };
    match NonNull::new(ptr) {
        Some(p) => p,
        None => handle_alloc_error(layout),
    }
}

/// Free a buffer obtained from [`cache_aligned_alloc`] with the same size.
///
/// # Safety
///
/// `ptr` must come from [`cache_aligned_alloc`] with exactly this `size`,
/// and must not be used afterwards.
pub unsafe fn cache_aligned_free(ptr: NonNull<u8>, size: usize) {
    dealloc(ptr.as_ptr(), cache_layout(size));
}

/// Heap array of `F` at cache-line alignment, zero-initialized.
///
/// Used for the optimizer's gradient/direction vectors and the packed
/// lower-triangle matrices, whose lengths are already rounded up to a
/// multiple of the SIMD lane count.
pub struct AlignedBuf<F: Float> {
    ptr: NonNull<F>,
    len: usize,
}

impl<F: Float> AlignedBuf<F> {
    /// Allocate `len` zeroed elements. `len` must be non-zero.
    pub fn zeroed(len: usize) -> Self {
        assert!(len > 0, "AlignedBuf requires a non-zero length");
        let bytes = len * std::mem::size_of::<F>();
        let ptr = cache_aligned_alloc(bytes).cast::<F>();
        AlignedBuf { ptr, len }
    }
}

impl<F: Float> Deref for AlignedBuf<F> {
    type Target = [F];

    #[inline]
    fn deref(&self) -> &[F] {
        // SAFETY: the buffer holds `len` initialized (zeroed) elements for
        // the lifetime of `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<F: Float> DerefMut for AlignedBuf<F> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [F] {
        // SAFETY: as in `deref`, plus exclusive access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<F: Float> Drop for AlignedBuf<F> {
    fn drop(&mut self) {
        let bytes = self.len * std::mem::size_of::<F>();
        // SAFETY: allocated in `zeroed` with the same size and alignment.
        unsafe { cache_aligned_free(self.ptr.cast::<u8>(), bytes) };
    }
}
