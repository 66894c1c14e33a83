//! Heap introspection trait

/// Trait for heap allocator introspection
///
/// Implementations query the board's allocator. Both readings are
/// point-in-time snapshots; the single-threaded cycle model means they
/// cannot race an allocation within the same cycle.
pub trait HeapMonitor {
    /// Total free heap in bytes
    fn free_bytes(&self) -> usize;

    /// Largest contiguous allocatable block in bytes
    ///
    /// Allocators that cannot walk their free list may return a
    /// conservative estimate, but must never overstate.
    fn largest_block(&self) -> usize;
}
