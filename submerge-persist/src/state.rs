//! `PartitionState`: the reorder buffer that turns out-of-order `Put`
//! completions into in-order callback delivery.
//!
//! The central invariant (spec section 4.4): callbacks for a partition
//! fire in strictly ascending sequence number with no gaps, regardless of
//! the order the underlying store finishes writing them. This is the same
//! shape as a network reorder buffer keyed on a monotonic sequence:
//! entries may retire out of order underneath, but what the caller sees
//! is always a contiguous prefix release.

use crate::request::Callback;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

struct Inner {
    next_expected_seq: u64,
    pending_callbacks: BTreeMap<u64, Callback>,
    persisted: BTreeMap<u64, bool>,
    enqueue_times: BTreeMap<u64, Instant>,
    disk_times: BTreeMap<u64, Instant>,
    initialized: bool,
}

/// One partition's bookkeeping for ordered callback release.
pub struct PartitionState {
    inner: Mutex<Inner>,
}

/// A callback ready to fire, in release order.
pub struct Release {
    pub seq_num: u64,
    pub ok: bool,
    pub callback: Callback,
}

impl PartitionState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_expected_seq: 0,
                pending_callbacks: BTreeMap::new(),
                persisted: BTreeMap::new(),
                enqueue_times: BTreeMap::new(),
                disk_times: BTreeMap::new(),
                initialized: false,
            }),
        }
    }

    /// Records that `seq_num` has been submitted, registering `callback`
    /// (if any) to fire once ordered release reaches it. Must be called
    /// before the request is visible to any worker, so that registration
    /// always precedes completion. `callback` may be `None` when the
    /// caller submitted without one; the sequence still participates in
    /// ordering so later sequences aren't released early.
    pub fn register(&self, seq_num: u64, callback: Option<Callback>) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.initialized {
            inner.next_expected_seq = seq_num;
            inner.initialized = true;
        }
        if let Some(callback) = callback {
            inner.pending_callbacks.insert(seq_num, callback);
        }
        inner.enqueue_times.insert(seq_num, Instant::now());
    }

    /// Records that `seq_num`'s `Put` completed with outcome `ok`, and
    /// returns every callback that is now ready to release, in order.
    pub fn complete(&self, seq_num: u64, ok: bool) -> Vec<Release> {
        let mut inner = self.inner.lock().unwrap();
        inner.persisted.insert(seq_num, ok);
        inner.disk_times.insert(seq_num, Instant::now());

        let mut released = Vec::new();
        while let Some(&ok) = inner.persisted.get(&inner.next_expected_seq) {
            let seq = inner.next_expected_seq;
            inner.persisted.remove(&seq);
            if let Some(enqueued_at) = inner.enqueue_times.remove(&seq) {
                tracing::trace!(
                    seq,
                    latency_us = enqueued_at.elapsed().as_micros() as u64,
                    "released"
                );
            }
            if let Some(disk_at) = inner.disk_times.remove(&seq) {
                tracing::trace!(
                    seq,
                    release_latency_us = disk_at.elapsed().as_micros() as u64,
                    "disk-to-release latency"
                );
            }
            let Some(callback) = inner.pending_callbacks.remove(&seq) else {
                // No callback was registered for this sequence (submit was
                // called without one); still advance past it.
                inner.next_expected_seq = seq + 1;
                continue;
            };
            released.push(Release {
                seq_num: seq,
                ok,
                callback,
            });
            inner.next_expected_seq = seq + 1;
        }
        released
    }

    /// Number of submissions registered but not yet released.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending_callbacks.len()
    }

    /// Drains every pending callback, in ascending sequence order, without
    /// regard to persistence state. Used only at shutdown.
    pub fn drain(&self) -> Vec<Release> {
        let mut inner = self.inner.lock().unwrap();
        let callbacks = std::mem::take(&mut inner.pending_callbacks);
        inner.persisted.clear();
        inner.enqueue_times.clear();
        inner.disk_times.clear();
        callbacks
            .into_iter()
            .map(|(seq_num, callback)| Release {
                seq_num,
                ok: false,
                callback,
            })
            .collect()
    }
}

impl Default for PartitionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "test/state.rs"]
mod test;
