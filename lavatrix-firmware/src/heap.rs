//! Global allocator and heap introspection
//!
//! The only dynamic allocation in the system is the guarded model input
//! buffer; the heap is sized for that buffer plus slack.

use embedded_alloc::LlffHeap as Heap;
use lavatrix_core::traits::HeapMonitor;

#[global_allocator]
static HEAP: Heap = Heap::empty();

/// Heap size: the 1.5x model input buffer (~41KB) plus headroom
pub const HEAP_SIZE: usize = 64 * 1024;

/// Initialize the heap allocator
pub fn init() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}

/// Heap probe for the pipeline's safety checks
pub struct HeapProbe;

impl HeapMonitor for HeapProbe {
    fn free_bytes(&self) -> usize {
        HEAP.free()
    }

    fn largest_block(&self) -> usize {
        // The allocator does not expose its free list. With at most one
        // live allocation the free space is split into at most two
        // regions, so half the total free is a floor on the largest.
        HEAP.free() / 2
    }
}
