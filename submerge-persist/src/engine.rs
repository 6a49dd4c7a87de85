//! `PersistenceEngine`: the public façade over C1-C6.
//!
//! Owns the store, the per-partition queues and reorder buffers, and the
//! worker pool, and exposes the operations described in spec section 4.7.

use crate::keycodec::encode_key;
use crate::queue::PartitionQueue;
use crate::request::{Callback, Request, WriteFuture};
use crate::sequence::SequenceAllocator;
use crate::state::PartitionState;
use crate::store::{EngineConfig, Metadata, StoreShard};
use crate::workers::WorkerPool;
use futures_channel::oneshot;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use submerge_base::Result;

struct Running {
    base_path: PathBuf,
    store: Arc<StoreShard>,
    queues: Arc<Vec<PartitionQueue>>,
    states: Arc<Vec<PartitionState>>,
    sequences: Arc<SequenceAllocator>,
    workers: Option<WorkerPool>,
    num_partitions: usize,
    num_workers: usize,
}

/// Durable append layer guaranteeing per-partition FIFO callback delivery.
///
/// See crate documentation and `SPEC_FULL.md` for the full contract.
/// `init`/`shutdown` are the only state transitions; re-initializing after
/// shutdown is allowed.
pub struct PersistenceEngine {
    running: Mutex<Option<Running>>,
    epoch: AtomicU32,
    shard_id: AtomicU32,
    num_shards: AtomicU32,
    pending_writes: Arc<AtomicU64>,
}

impl PersistenceEngine {
    pub fn new() -> Self {
        Self {
            running: Mutex::new(None),
            epoch: AtomicU32::new(0),
            shard_id: AtomicU32::new(0),
            num_shards: AtomicU32::new(1),
            pending_writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Idempotent: returns `true` without reconfiguring if already
    /// initialized. Opens one store per partition, spawns `num_workers`
    /// workers. On a store-open failure, returns `false` and leaves the
    /// engine uninitialized; any partially-opened shards were already
    /// closed by `StoreShard::open`.
    pub fn init(
        &self,
        base_path: impl AsRef<Path>,
        num_partitions: usize,
        num_workers: usize,
        shard_id: u32,
        num_shards: u32,
    ) -> bool {
        self.init_with_config(
            base_path,
            num_partitions,
            num_workers,
            shard_id,
            num_shards,
            &EngineConfig::default(),
        )
    }

    pub fn init_with_config(
        &self,
        base_path: impl AsRef<Path>,
        num_partitions: usize,
        num_workers: usize,
        shard_id: u32,
        num_shards: u32,
        config: &EngineConfig,
    ) -> bool {
        assert!(num_partitions >= 1, "num_partitions must be at least 1");
        assert!(num_workers >= 1, "num_workers must be at least 1");

        let mut running = self.running.lock().unwrap();
        if running.is_some() {
            return true;
        }

        let store = match StoreShard::open(base_path.as_ref(), num_partitions, config) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = ?e, "engine init failed: store open error");
                return false;
            }
        };

        let queues: Arc<Vec<PartitionQueue>> =
            Arc::new((0..num_partitions).map(|_| PartitionQueue::new()).collect());
        let states: Arc<Vec<PartitionState>> =
            Arc::new((0..num_partitions).map(|_| PartitionState::new()).collect());

        self.shard_id.store(shard_id, Ordering::SeqCst);
        self.num_shards.store(num_shards, Ordering::SeqCst);

        let workers = WorkerPool::spawn(
            num_workers,
            Arc::clone(&queues),
            Arc::clone(&states),
            Arc::clone(&store),
            Arc::clone(&self.pending_writes),
        );

        *running = Some(Running {
            base_path: base_path.as_ref().to_path_buf(),
            store,
            queues,
            states,
            sequences: Arc::new(SequenceAllocator::new(num_partitions)),
            workers: Some(workers),
            num_partitions,
            num_workers,
        });

        tracing::info!(
            num_partitions,
            num_workers,
            shard_id,
            num_shards,
            "persistence engine initialized"
        );
        true
    }

    /// Submits `payload` for durable, ordered-callback append to
    /// `partition_id`. See spec section 4.7 for the three outcome paths.
    pub fn submit(
        &self,
        payload: Vec<u8>,
        partition_id: u32,
        callback: Option<Callback>,
    ) -> WriteFuture {
        let (tx, rx) = oneshot::channel();

        // Only the init/shutdown lifecycle transition needs `self.running`;
        // once the shared state is cloned out, the lock is released and
        // submissions to different partitions never wait on each other or
        // on this lock again.
        let (queues, states, sequences, num_partitions) = {
            let running = self.running.lock().unwrap();
            let Some(running) = running.as_ref() else {
                // Not initialized: a no-op success path for replicas that
                // never durably log (spec section 7, `NotInitialized`).
                let _ = tx.send(true);
                if let Some(cb) = callback {
                    cb(true);
                }
                return rx;
            };
            (
                Arc::clone(&running.queues),
                Arc::clone(&running.states),
                Arc::clone(&running.sequences),
                running.num_partitions,
            )
        };

        if partition_id as usize >= num_partitions {
            tracing::warn!(
                partition_id,
                num_partitions,
                "invalid partition_id, rejecting"
            );
            let _ = tx.send(false);
            if let Some(cb) = callback {
                cb(false);
            }
            return rx;
        }

        let mut epoch = self.epoch.load(Ordering::SeqCst);
        if epoch == 0 {
            // The original accommodates callers who never called
            // set_epoch before the first write by bumping to 1 lazily.
            epoch = 1;
            self.epoch.store(epoch, Ordering::SeqCst);
        }

        let partition = partition_id as usize;
        let shard_id = self.shard_id.load(Ordering::SeqCst);

        // Sequence allocation, `PartitionState` registration, and the
        // enqueue all happen under this partition's own `seq_mutex` (spec
        // section 4.2's joint invariant), not a process-wide lock: submits
        // to different partitions never contend with each other here.
        let seq_num = {
            let _seq_guard = queues[partition].lock_seq();
            let seq_num = sequences.next(partition_id);
            states[partition].register(seq_num, callback);

            let key = encode_key(shard_id, partition_id, epoch, seq_num);
            self.pending_writes.fetch_add(1, Ordering::SeqCst);
            queues[partition].push(Request {
                key,
                payload,
                partition_id,
                seq_num,
                completion: tx,
            });
            seq_num
        };

        if seq_num % 100 == 0 {
            tracing::debug!(
                partition_id,
                seq_num,
                pending = self.pending_writes.load(Ordering::SeqCst),
                "pending writes"
            );
        }

        rx
    }

    /// Updates the engine's epoch. If it actually changed, rewrites
    /// metadata. Concurrent in-flight submits are not fenced against this:
    /// some may land under the old epoch and some under the new (spec
    /// section 9, accepted and documented, not a bug).
    pub fn set_epoch(&self, epoch: u32) {
        let old = self.epoch.swap(epoch, Ordering::SeqCst);
        if old != epoch {
            let shard_id = self.shard_id.load(Ordering::SeqCst);
            let num_shards = self.num_shards.load(Ordering::SeqCst);
            if self.write_metadata(shard_id, num_shards) {
                tracing::info!(
                    old_epoch = old,
                    new_epoch = epoch,
                    "epoch changed, metadata updated"
                );
            }
        }
    }

    pub fn current_epoch(&self) -> u32 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Flushes every partition's store. Returns `true` iff all succeed.
    pub fn flush_all(&self) -> bool {
        let running = self.running.lock().unwrap();
        match running.as_ref() {
            Some(running) => running.store.flush_all().is_ok(),
            None => false,
        }
    }

    /// Composes the metadata string and writes it under `"meta"` into
    /// partition 0.
    pub fn write_metadata(&self, shard_id: u32, num_shards: u32) -> bool {
        self.shard_id.store(shard_id, Ordering::SeqCst);
        self.num_shards.store(num_shards, Ordering::SeqCst);

        let running = self.running.lock().unwrap();
        let Some(running) = running.as_ref() else {
            return false;
        };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let meta = Metadata {
            epoch: self.epoch.load(Ordering::SeqCst),
            shard_id,
            num_shards,
            num_partitions: running.num_partitions,
            num_workers: running.num_workers,
            timestamp,
        };
        match running.store.write_metadata(&meta.render()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = ?e, "failed to write metadata");
                false
            }
        }
    }

    /// Reads and parses the metadata record, without needing a running
    /// engine instance: opens partition 0 fresh at `base_path`.
    pub fn read_metadata(base_path: impl AsRef<Path>) -> Result<Metadata> {
        StoreShard::read_metadata(base_path.as_ref())
    }

    /// Current count of unretired requests across all partitions: those
    /// submitted whose underlying `Put` has not yet completed.
    pub fn pending_writes(&self) -> u64 {
        self.pending_writes.load(Ordering::SeqCst)
    }

    /// Number of partitions the engine was initialized with, or 0 if
    /// uninitialized.
    pub fn num_partitions(&self) -> usize {
        match self.running.lock().unwrap().as_ref() {
            Some(running) => running.store.num_partitions(),
            None => 0,
        }
    }

    /// Number of submissions registered but not yet released for
    /// `partition_id`, or 0 if the partition doesn't exist or the engine
    /// isn't initialized.
    pub fn pending_count(&self, partition_id: u32) -> usize {
        match self.running.lock().unwrap().as_ref() {
            Some(running) => running
                .states
                .get(partition_id as usize)
                .map(|s| s.pending_count())
                .unwrap_or(0),
            None => 0,
        }
    }

    /// Sets the shutdown flag, wakes and joins all workers, drains
    /// remaining queued requests (resolving their futures and firing
    /// their callbacks with `false`, in order), flushes the WAL, and
    /// closes the stores. The engine may be re-initialized afterward.
    pub fn shutdown(&self) {
        let mut running = self.running.lock().unwrap();
        let Some(mut state) = running.take() else {
            return;
        };

        if let Some(workers) = state.workers.take() {
            workers.shutdown();
        }

        for queue in state.queues.iter() {
            for req in queue.drain() {
                let _ = req.completion.send(false);
                // This request's `submit` call incremented `pending_writes`
                // and, being still queued, was never picked up by a worker
                // to decrement it; undo that increment here so the counter
                // reaches 0 once every future has resolved.
                self.pending_writes.fetch_sub(1, Ordering::SeqCst);
            }
        }
        for partition_state in state.states.iter() {
            for release in partition_state.drain() {
                (release.callback)(false);
            }
        }

        if let Err(e) = state.store.flush_all() {
            tracing::warn!(error = ?e, "flush at shutdown failed");
        }

        tracing::info!(base_path = %state.base_path.display(), "persistence engine shut down");
        // `state.store` is the last `Arc` reference once workers have
        // joined and the lock is released, so it drops (closing the
        // embedded stores) when this function returns.
    }
}

impl Default for PersistenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "test/engine.rs"]
mod test;
