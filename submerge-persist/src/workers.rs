//! Fixed-size worker pool draining all partition queues.
//!
//! Worker `w` owns partitions `{ p : p mod num_workers == w }`. This is
//! contention-free -- no queue is ever touched by two workers -- and gives
//! every partition a dedicated owner, at the cost of tolerating load
//! imbalance across partitions (each partition's throughput is capped by
//! its one owning worker, bounded in practice by the store's `Put`
//! latency rather than CPU). A work-stealing pool would also satisfy the
//! ordering properties, provided the completion path still funnels
//! through the owning `PartitionState`; this crate takes the simpler,
//! zero-contention design per spec section 4.5 and 4.9.

use crate::queue::PartitionQueue;
use crate::state::PartitionState;
use crate::store::StoreShard;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Worker-wait timeout. Purely so a parked worker notices the shutdown
/// flag; it has no functional meaning otherwise.
const WAIT_TIMEOUT: Duration = Duration::from_millis(10);

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    queues: Arc<Vec<PartitionQueue>>,
}

impl WorkerPool {
    /// Spawns `num_workers` threads, each owning partitions
    /// `{ p : p mod num_workers == worker_id }`.
    pub fn spawn(
        num_workers: usize,
        queues: Arc<Vec<PartitionQueue>>,
        states: Arc<Vec<PartitionState>>,
        store: Arc<StoreShard>,
        pending_writes: Arc<AtomicU64>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let num_partitions = queues.len();
        let mut handles = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let owned: Vec<usize> = (worker_id..num_partitions).step_by(num_workers).collect();
            let worker_queues = Arc::clone(&queues);
            let states = Arc::clone(&states);
            let store = Arc::clone(&store);
            let pending_writes = Arc::clone(&pending_writes);
            let shutdown = Arc::clone(&shutdown);
            handles.push(
                std::thread::Builder::new()
                    .name(format!("submerge-persist-worker-{worker_id}"))
                    .spawn(move || {
                        worker_loop(
                            worker_id,
                            owned,
                            worker_queues,
                            states,
                            store,
                            pending_writes,
                            shutdown,
                        )
                    })
                    .expect("failed to spawn persistence worker thread"),
            );
        }

        Self {
            handles,
            shutdown,
            queues,
        }
    }

    /// Signals all workers to stop, wakes any parked on an empty queue so
    /// they notice the flag immediately rather than at the next timeout,
    /// and joins them. Workers finish whatever request they're
    /// mid-processing first; anything still sitting in a queue afterward
    /// is the caller's job to drain.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for queue in self.queues.iter() {
            queue.notify_all();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    owned: Vec<usize>,
    queues: Arc<Vec<PartitionQueue>>,
    states: Arc<Vec<PartitionState>>,
    store: Arc<StoreShard>,
    pending_writes: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
) {
    tracing::debug!(worker_id, partitions = ?owned, "worker started");
    loop {
        let mut processed = None;
        for &partition_id in &owned {
            if let Some(req) = queues[partition_id].try_pop() {
                processed = Some(req);
                break;
            }
        }

        let req = match processed {
            Some(req) => req,
            None => {
                if owned.is_empty() {
                    break;
                }
                let wait_partition = owned[0];
                let woken = queues[wait_partition].wait_pop(WAIT_TIMEOUT);
                if let Some(req) = woken {
                    req
                } else if shutdown.load(Ordering::SeqCst)
                    && owned.iter().all(|&p| queues[p].is_empty())
                {
                    break;
                } else {
                    continue;
                }
            }
        };

        let partition_id = req.partition_id as usize;
        let ok = match store.put(req.partition_id, &req.key, &req.payload) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(partition = req.partition_id, seq = req.seq_num, error = ?e, "write failed");
                false
            }
        };

        let _ = req.completion.send(ok);
        for release in states[partition_id].complete(req.seq_num, ok) {
            tracing::trace!(
                partition_id,
                seq = release.seq_num,
                ok = release.ok,
                "delivering callback"
            );
            (release.callback)(release.ok);
        }
        pending_writes.fetch_sub(1, Ordering::SeqCst);
    }
    tracing::debug!(worker_id, "worker stopped");
}

#[cfg(test)]
#[path = "test/workers.rs"]
mod test;
