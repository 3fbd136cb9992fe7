//! Thread-local bump arena for gradient buffers.
//!
//! Every [`MDiff`](crate::MDiff) owns one fixed-size buffer of derivative
//! lanes. Buffers are carved out of cache-aligned blocks by a per-thread
//! bump pointer; releasing a buffer decrements its block's countdown, and a
//! block whose countdown reaches zero is recycled through a process-global
//! lock-free free list so other threads (or later allocations) can reuse it.
//!
//! All state except the free list is thread-local, so independent contexts
//! may run concurrently on different threads without synchronization. An
//! `MDiff` must never cross threads and must not outlive its [`Context`].

use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::alloc::{cache_aligned_alloc, cache_aligned_free, CACHE_ALIGN};
use crate::float::Float;
use crate::pack::next_multiple_of_lanes;

/// Preferred block size. Blocks grow beyond this only when a single
/// gradient buffer does not fit.
const MIN_BLOCK_SIZE: usize = 4096;

#[repr(C)]
struct Block {
    next: *mut Block,
    /// Buffers still outstanding once the block has been fully carved.
    countdown: usize,
    /// Total allocation size in bytes, header included.
    size: usize,
}

impl Block {
    /// Header footprint, padded so the first buffer is SIMD-aligned.
    const OFFSET: usize =
        (std::mem::size_of::<Block>() + CACHE_ALIGN - 1) / CACHE_ALIGN * CACHE_ALIGN;

    fn size_for(buffer_size: usize) -> usize {
        let need = Self::OFFSET + buffer_size;
        (need + MIN_BLOCK_SIZE - 1) / MIN_BLOCK_SIZE * MIN_BLOCK_SIZE
    }
}

/// Process-global stack of empty blocks, shared across threads.
static FREE_BLOCKS: AtomicPtr<Block> = AtomicPtr::new(ptr::null_mut());

fn free_list_push(block: *mut Block) {
    let mut head = FREE_BLOCKS.load(Ordering::Relaxed);
    loop {
        // SAFETY: we own `block` until the exchange succeeds.
        unsafe { (*block).next = head };
        match FREE_BLOCKS.compare_exchange_weak(head, block, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return,
            Err(h) => head = h,
        }
    }
}

fn free_list_pop() -> *mut Block {
    let mut head = FREE_BLOCKS.load(Ordering::Acquire);
    while !head.is_null() {
        // SAFETY: a linked block stays valid until some thread pops it; the
        // exchange below only succeeds for the thread that read `next`.
        let next = unsafe { (*head).next };
        match FREE_BLOCKS.compare_exchange_weak(head, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return head,
            Err(h) => head = h,
        }
    }
    ptr::null_mut()
}

/// Pop a block of exactly `size` bytes. Blocks of other sizes (left over
/// from contexts with a different direction count) are freed on the spot.
fn free_list_pop_matching(size: usize) -> *mut Block {
    loop {
        let block = free_list_pop();
        if block.is_null() {
            return block;
        }
        // SAFETY: popped blocks are exclusively ours.
        let block_size = unsafe { (*block).size };
        if block_size == size {
            return block;
        }
        // SAFETY: allocated by `cache_aligned_alloc` with `block_size`.
        unsafe { cache_aligned_free(ptr::NonNull::new_unchecked(block.cast()), block_size) };
    }
}

struct ThreadArena {
    next_buffer: Cell<*mut u8>,
    block_end: Cell<*mut u8>,
    used_blocks: Cell<*mut Block>,
    buffer_size: Cell<usize>,
    num_directions: Cell<usize>,
}

thread_local! {
    static ARENA: ThreadArena = const {
        ThreadArena {
            next_buffer: Cell::new(ptr::null_mut()),
            block_end: Cell::new(ptr::null_mut()),
            used_blocks: Cell::new(ptr::null_mut()),
            buffer_size: Cell::new(0),
            num_directions: Cell::new(0),
        }
    };
}

/// Derivative lane count of the active context on this thread.
///
/// Zero when no context is active.
#[inline]
pub fn num_directions() -> usize {
    ARENA.with(|a| a.num_directions.get())
}

/// Hand out one gradient buffer, bumping the current block or pulling a
/// fresh one. Panics without an active context; aborts on out-of-memory.
pub(crate) fn new_buffer() -> *mut u8 {
    ARENA.with(|a| {
        let bsize = a.buffer_size.get();
        assert!(bsize != 0, "no active AD context on this thread");

        let mut next = a.next_buffer.get();
        if next == a.block_end.get() {
            let size = Block::size_for(bsize);
            let mut block = free_list_pop_matching(size);
            if block.is_null() {
                block = cache_aligned_alloc(size).cast::<Block>().as_ptr();
            }
            let capacity = (size - Block::OFFSET) / bsize;
            // SAFETY: the block spans `size` bytes and is exclusively ours.
            unsafe {
                (*block).next = a.used_blocks.get();
                (*block).countdown = capacity;
                (*block).size = size;
                a.used_blocks.set(block);
                next = block.cast::<u8>().add(Block::OFFSET);
                a.block_end.set(next.add(capacity * bsize));
            }
        }

        // SAFETY: `next + bsize` stays within the current block's region.
        a.next_buffer.set(unsafe { next.add(bsize) });
        next
    })
}

/// Return a buffer to its block. When the block's last buffer comes back it
/// is unlinked from the thread's list and pushed onto the shared free list.
pub(crate) fn release_buffer(buf: *mut u8) {
    if buf.is_null() {
        return;
    }
    ARENA.with(|a| {
        let mut prev: *mut Block = ptr::null_mut();
        let mut blk = a.used_blocks.get();
        loop {
            assert!(
                !blk.is_null(),
                "gradient buffer released outside its AD context"
            );
            let distance = (buf as usize).wrapping_sub(blk as usize);
            // SAFETY: `blk` is linked in this thread's list, so its header
            // is valid; the distance check identifies the owning block.
            unsafe {
                if distance < (*blk).size {
                    (*blk).countdown -= 1;
                    if (*blk).countdown == 0 {
                        // A drained block is necessarily full, so the bump
                        // range never points into it. Recycle it.
                        if prev.is_null() {
                            a.used_blocks.set((*blk).next);
                        } else {
                            (*prev).next = (*blk).next;
                        }
                        free_list_push(blk);
                    }
                    return;
                }
                prev = blk;
                blk = (*blk).next;
            }
        }
    })
}

/// Number of blocks currently holding live buffers on this thread.
pub fn active_blocks() -> usize {
    ARENA.with(|a| {
        let mut count = 0;
        let mut blk = a.used_blocks.get();
        while !blk.is_null() {
            count += 1;
            // SAFETY: the list is thread-local and blocks are valid while linked.
            blk = unsafe { (*blk).next };
        }
        count
    })
}

/// Number of empty blocks waiting on the shared free list.
///
/// Approximate under concurrency; intended for tests and diagnostics.
pub fn free_blocks() -> usize {
    let mut count = 0;
    let mut blk = FREE_BLOCKS.load(Ordering::Acquire);
    while !blk.is_null() {
        count += 1;
        // SAFETY: see `free_list_pop`; traversal is only reliable when no
        // other thread is popping, which holds in the tests that use this.
        blk = unsafe { (*blk).next };
    }
    count
}

/// Scope for multi-directional differentiation.
///
/// Creating a context fixes the number of derivative lanes (rounded up to
/// the SIMD lane count) and the per-buffer size for this thread. All
/// [`MDiff`](crate::MDiff) values must be created and dropped while their
/// context is alive; dropping the context releases every block.
///
/// Contexts do not nest and cannot move across threads.
pub struct Context<F: Float> {
    // Raw pointer keeps the context pinned to its thread.
    _marker: PhantomData<(F, *mut u8)>,
}

impl<F: Float> Context<F> {
    /// Open a context for `num_directions` independent variables.
    ///
    /// Panics if a context is already active on this thread.
    pub fn new(num_directions: usize) -> Self {
        assert!(num_directions > 0, "context needs at least one direction");
        ARENA.with(|a| {
            assert_eq!(
                a.buffer_size.get(),
                0,
                "an AD context is already active on this thread"
            );
            let nd = next_multiple_of_lanes::<F>(num_directions);
            a.num_directions.set(nd);
            a.buffer_size.set(nd * std::mem::size_of::<F>());
        });
        Context {
            _marker: PhantomData,
        }
    }

    /// Lane count per gradient buffer, padding included.
    pub fn num_directions(&self) -> usize {
        num_directions()
    }
}

impl<F: Float> Drop for Context<F> {
    fn drop(&mut self) {
        ARENA.with(|a| {
            let mut blk = a.used_blocks.get();
            while !blk.is_null() {
                // SAFETY: blocks on the thread list were allocated with the
                // size recorded in their header.
                unsafe {
                    let next = (*blk).next;
                    cache_aligned_free(ptr::NonNull::new_unchecked(blk.cast()), (*blk).size);
                    blk = next;
                }
            }
            a.used_blocks.set(ptr::null_mut());
            a.next_buffer.set(ptr::null_mut());
            a.block_end.set(ptr::null_mut());
            a.buffer_size.set(0);
            a.num_directions.set(0);
        });
        // Drain the shared free list as well so closing the last context
        // returns all memory to the allocator.
        loop {
            let blk = free_list_pop();
            if blk.is_null() {
                break;
            }
            // SAFETY: popped blocks are exclusively ours and carry their size.
            unsafe {
                cache_aligned_free(ptr::NonNull::new_unchecked(blk.cast()), (*blk).size);
            }
        }
    }
}
