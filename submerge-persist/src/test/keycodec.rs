use crate::keycodec::{encode_key, KEY_LEN};
use test_log::test;

#[test]
fn test_key_format_s5() {
    // S5 from spec section 8: epoch=42, shard=1, partition=2, seq=7.
    let key = encode_key(1, 2, 42, 7);
    assert_eq!(
        std::str::from_utf8(&key).unwrap(),
        "001:002:00000042:0000000000000007"
    );
    assert_eq!(key.len(), KEY_LEN);
}

#[test]
fn test_key_uniqueness_and_order() {
    // Property 6: within one (shard, partition, epoch), keys strictly
    // increase with sequence and never repeat.
    let keys: Vec<_> = (0..1000u64).map(|seq| encode_key(0, 0, 1, seq)).collect();
    for w in keys.windows(2) {
        assert!(w[0] < w[1]);
    }
}

#[test]
fn test_field_widths_never_overflow_for_small_values() {
    let key = encode_key(0, 0, 0, 0);
    assert_eq!(
        std::str::from_utf8(&key).unwrap(),
        "000:000:00000000:0000000000000000"
    );
}
