//! Fixed-width lexicographic key encoding and the metadata record key.
//!
//! Keys are `shard(3):partition(3):epoch(8):sequence(16)`, zero-padded
//! ASCII decimal, colons literal. Byte-lexicographic order over encoded
//! keys therefore equals numeric order within each field, which is what
//! lets a store scan one (shard, partition, epoch) range in submission
//! order without decoding anything. Decoding is not part of the contract;
//! only encoding is ever needed on the hot path.

/// Total encoded key length: `sss:ppp:eeeeeeee:ssssssssssssssss`.
pub const KEY_LEN: usize = 33;

/// Reserved key under which the metadata record is stored, in partition 0.
pub const METADATA_KEY: &str = "meta";

/// Encodes `(shard_id, partition_id, epoch, seq_num)` into the fixed-width
/// ASCII key described in spec section 6.
pub fn encode_key(shard_id: u32, partition_id: u32, epoch: u32, seq_num: u64) -> [u8; KEY_LEN] {
    let mut buf = [0u8; KEY_LEN];
    let rendered = format!(
        "{:03}:{:03}:{:08}:{:016}",
        shard_id, partition_id, epoch, seq_num
    );
    debug_assert_eq!(rendered.len(), KEY_LEN);
    buf.copy_from_slice(rendered.as_bytes());
    buf
}

#[cfg(test)]
#[path = "test/keycodec.rs"]
mod test;
