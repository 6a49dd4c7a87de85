//! The `Request` type threaded from submit through the queue, the store,
//! and into ordered release.

use futures_channel::oneshot;

/// One pending write, queued for a single partition.
///
/// The request carries no callback: once `PartitionState` has taken the
/// callback at submission time, re-storing it here would let it fire
/// twice if something ever handed the request back around. Callbacks
/// live in `PartitionState` exclusively from submission until release.
pub struct Request {
    pub key: [u8; crate::keycodec::KEY_LEN],
    pub payload: Vec<u8>,
    pub partition_id: u32,
    pub seq_num: u64,
    pub completion: oneshot::Sender<bool>,
}

/// A handle to a submission's eventual outcome.
///
/// Resolves when the underlying store's `Put` completes, regardless of
/// ordering -- unlike the callback, which only fires once ordered release
/// reaches this sequence. See spec section 4.7.
pub type WriteFuture = oneshot::Receiver<bool>;

/// A callback fired in strict sequence order per partition once ordered
/// release reaches this request's sequence number. Must not panic:
/// a panicking callback poisons the partition state lock and wedges the
/// partition.
pub type Callback = Box<dyn FnOnce(bool) + Send>;
