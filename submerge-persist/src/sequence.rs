//! Per-partition monotonic sequence numbers.
//!
//! Sequence allocation must happen under the same lock that guards the
//! partition's queue, so that queue order equals sequence order. This
//! module only hands out the number; the caller (the engine's submit
//! path, under `PartitionQueue::seq_mutex`) is responsible for enqueueing
//! within the same critical section. Each partition gets its own atomic
//! counter, so allocating a sequence number for one partition never
//! contends with any other.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing sequence numbers per partition, starting
/// at 0. Sized at construction to the engine's fixed partition count.
pub struct SequenceAllocator {
    next: Vec<AtomicU64>,
}

impl SequenceAllocator {
    pub fn new(num_partitions: usize) -> Self {
        Self {
            next: (0..num_partitions).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Returns the next sequence number for `partition_id`, starting at 0.
    pub fn next(&self, partition_id: u32) -> u64 {
        self.next[partition_id as usize].fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "test/sequence.rs"]
mod test;
