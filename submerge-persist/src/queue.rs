//! A bounded-contention FIFO of pending requests for one partition.
//!
//! Invariant: requests are pushed in monotonically increasing
//! sequence-number order. That's enforced by the caller, not here --
//! `PartitionQueue` only guarantees FIFO delivery of whatever is pushed.
//! Fairness across partitions is not this type's job; `WorkerPool`
//! decides which partitions to poll and in what order.
//!
//! Also carries this partition's `seq_mutex`: the lock the engine's
//! submit path holds across sequence allocation, `PartitionState`
//! registration, and the push below, so that queue order equals
//! allocation order. It's colocated here rather than in `SequenceAllocator`
//! because it's a property of the partition, not of the counter.

use crate::request::Request;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

pub struct PartitionQueue {
    queue: Mutex<VecDeque<Request>>,
    cv: Condvar,
    seq_mutex: Mutex<()>,
}

impl PartitionQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            cv: Condvar::new(),
            seq_mutex: Mutex::new(()),
        }
    }

    /// Acquires this partition's sequence mutex. Held by the submit path
    /// across allocate+register+enqueue; never touched by `WorkerPool`, so
    /// submission to one partition never blocks on another.
    pub fn lock_seq(&self) -> MutexGuard<'_, ()> {
        self.seq_mutex.lock().unwrap()
    }

    /// Pushes a request and wakes one waiter. O(1).
    pub fn push(&self, req: Request) {
        let mut queue = self.queue.lock().unwrap();
        queue.push_back(req);
        drop(queue);
        self.cv.notify_one();
    }

    /// Pops the head request without waiting, if any is present.
    pub fn try_pop(&self) -> Option<Request> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Waits up to `timeout` for a request to appear, then pops it.
    ///
    /// The timeout has no functional meaning beyond letting the caller
    /// re-check a shutdown flag; wakeups are otherwise driven by `push`.
    pub fn wait_pop(&self, timeout: Duration) -> Option<Request> {
        let queue = self.queue.lock().unwrap();
        let (mut queue, _) = self
            .cv
            .wait_timeout_while(queue, timeout, |q| q.is_empty())
            .unwrap();
        queue.pop_front()
    }

    /// Notifies every thread waiting on this queue (used at shutdown).
    pub fn notify_all(&self) {
        self.cv.notify_all();
    }

    /// Drains all remaining requests, in FIFO order, for shutdown.
    pub fn drain(&self) -> Vec<Request> {
        self.queue.lock().unwrap().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

impl Default for PartitionQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "test/queue.rs"]
mod test;
