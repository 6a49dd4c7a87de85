use crate::store::{EngineConfig, Metadata, StoreShard};
use test_log::test;

#[test]
fn test_open_put_flush_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("db");
    let config = EngineConfig::default();
    let store = StoreShard::open(&base, 4, &config).unwrap();
    assert_eq!(store.num_partitions(), 4);

    store
        .put(2, b"001:002:00000001:0000000000000000", b"hello")
        .unwrap();
    store.flush_all().unwrap();
}

#[test]
fn test_metadata_round_trip_s7() {
    // S7 / property 7 from spec section 8.
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("db");
    let config = EngineConfig::default();
    let store = StoreShard::open(&base, 2, &config).unwrap();

    let meta = Metadata {
        epoch: 7,
        shard_id: 1,
        num_shards: 3,
        num_partitions: 2,
        num_workers: 2,
        timestamp: 1_700_000_000,
    };
    store.write_metadata(&meta.render()).unwrap();
    store.flush_all().unwrap();
    drop(store);

    let read_back = StoreShard::read_metadata(&base).unwrap();
    assert_eq!(read_back, meta);
}

#[test]
fn test_metadata_parse_tolerates_key_reordering() {
    let reordered = "timestamp:5,epoch:1,num_workers:2,shard_id:0,num_shards:1,num_partitions:4";
    let meta = Metadata::parse(reordered).unwrap();
    assert_eq!(meta.epoch, 1);
    assert_eq!(meta.num_partitions, 4);
    assert_eq!(meta.timestamp, 5);
}

#[test]
fn test_open_failure_rolls_back_partial_partitions() {
    // Opening a path that is actually a plain file (not a directory)
    // fails; earlier-opened partitions for the same call must not leak.
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("db");
    std::fs::create_dir_all(&base.parent().unwrap()).unwrap();
    // Pre-create partition 1's path as a regular file so sled fails to
    // open it as a database directory.
    std::fs::write(format!("{}_partition1", base.display()), b"not a db").unwrap();

    let config = EngineConfig::default();
    let result = StoreShard::open(&base, 3, &config);
    assert!(result.is_err());
}
