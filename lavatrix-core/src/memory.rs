//! Guarded model-input buffer management
//!
//! The model input buffer is the only heap allocation in the pipeline.
//! It is allocated once with a 50% safety margin over the minimum size,
//! zero-initialized, and held until explicit release or restart. Every
//! allocation is bracketed by heap checks so a cycle never starts on a
//! heap that cannot sustain it.

use alloc::vec::Vec;

use crate::config::MemoryPolicy;
use crate::traits::HeapMonitor;

/// Safety margin applied over the minimum buffer size (x3/2)
pub const MARGIN_NUM: usize = 3;
pub const MARGIN_DEN: usize = 2;

/// Errors that can occur acquiring the guarded buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryError {
    /// Heap state failed the pre-allocation safety check
    Unsafe,
    /// Allocation failed, or succeeded but left the heap below the floor
    AllocationFailed,
}

/// Owner of the model input buffer
///
/// The buffer must never be read through the signal adapter unless it is
/// actually held; [`MemoryGuard::buffer`] returning `Some` is that flag.
#[derive(Debug)]
pub struct MemoryGuard {
    policy: MemoryPolicy,
    buffer: Option<Vec<u8>>,
}

impl MemoryGuard {
    /// Create a guard with the given policy; allocates nothing
    pub fn new(policy: MemoryPolicy) -> Self {
        Self {
            policy,
            buffer: None,
        }
    }

    /// Check whether the heap can sustain a classification cycle
    ///
    /// Rejects when free heap is below the floor, when the largest
    /// contiguous block is below the block floor, or when the largest
    /// block is less than half of total free memory (fragmentation).
    /// Any one condition is sufficient to reject.
    pub fn is_safe_to_proceed(&self, heap: &impl HeapMonitor) -> bool {
        let free = heap.free_bytes();
        let largest = heap.largest_block();

        if free < self.policy.min_free_heap {
            return false;
        }
        if largest < self.policy.min_largest_block {
            return false;
        }
        // Fragmentation heuristic: a free list split into shards smaller
        // than half the total is not worth allocating from
        if largest < free / 2 {
            return false;
        }
        true
    }

    /// Acquire the model input buffer
    ///
    /// Idempotent: if a buffer is already held it is kept as-is.
    /// Otherwise allocates `min_size` x 1.5 bytes, zeroed. If free
    /// memory drops below the block floor after allocation, the buffer
    /// is freed again and the acquisition reports failure; an allocation
    /// that succeeds but starves the rest of the system is not a
    /// success.
    pub fn acquire(
        &mut self,
        min_size: usize,
        heap: &impl HeapMonitor,
    ) -> Result<(), MemoryError> {
        if self.buffer.is_some() {
            return Ok(());
        }

        if !self.is_safe_to_proceed(heap) {
            return Err(MemoryError::Unsafe);
        }

        let size = min_size * MARGIN_NUM / MARGIN_DEN;
        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| MemoryError::AllocationFailed)?;
        buf.resize(size, 0);

        if heap.free_bytes() < self.policy.min_largest_block {
            // Successful but unsafe: undo it
            drop(buf);
            return Err(MemoryError::AllocationFailed);
        }

        self.buffer = Some(buf);
        Ok(())
    }

    /// Release the buffer
    ///
    /// Safe to call when nothing is held.
    pub fn release(&mut self) {
        self.buffer = None;
    }

    /// Whether the buffer is currently held
    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// The held buffer, if any
    pub fn buffer(&self) -> Option<&[u8]> {
        self.buffer.as_deref()
    }

    /// Mutable access to the held buffer, if any
    pub fn buffer_mut(&mut self) -> Option<&mut [u8]> {
        self.buffer.as_deref_mut()
    }

    /// Allocated capacity in bytes (0 when released)
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().map(|b| b.len()).unwrap_or(0)
    }
}
