//! Partitioned ordered persistence engine.
//!
//! A durable append layer sitting underneath the rest of the research OLTP
//! stack: callers submit opaque payloads to a partition, and get back both
//! a future that resolves once the payload is durable, and (optionally) a
//! callback that fires once every submission before it in that partition
//! has also been durably persisted -- so a partition's callbacks always
//! fire in the order its payloads were submitted, even though the
//! underlying store may finish writing them in any order.
//!
//! Partitions are fully independent: no lock, queue, or ordering guarantee
//! crosses a partition boundary, which is what lets submission throughput
//! scale with partition count. See `SPEC_FULL.md` for the full contract.

mod engine;
mod keycodec;
mod queue;
mod request;
mod sequence;
mod state;
mod store;
mod workers;

pub use engine::PersistenceEngine;
pub use keycodec::{encode_key, KEY_LEN, METADATA_KEY};
pub use request::{Callback, WriteFuture};
pub use store::{EngineConfig, Metadata};
