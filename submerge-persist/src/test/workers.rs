use crate::keycodec::encode_key;
use crate::queue::PartitionQueue;
use crate::request::Request;
use crate::state::PartitionState;
use crate::store::{EngineConfig, StoreShard};
use crate::workers::WorkerPool;
use futures_channel::oneshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use test_log::test;

#[test]
fn test_round_robin_ownership_covers_every_partition_exactly_once() {
    let num_partitions = 7usize;
    let num_workers = 3usize;
    let mut covered = vec![false; num_partitions];
    for worker_id in 0..num_workers {
        for p in (worker_id..num_partitions).step_by(num_workers) {
            assert!(!covered[p], "partition {p} owned by more than one worker");
            covered[p] = true;
        }
    }
    assert!(
        covered.iter().all(|&c| c),
        "every partition must have an owner"
    );
}

#[test]
fn test_worker_pool_processes_requests_and_releases_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("db");
    let num_partitions = 2;
    let store =
        Arc::new(StoreShard::open(&base, num_partitions, &EngineConfig::default()).unwrap());
    let queues: Arc<Vec<PartitionQueue>> =
        Arc::new((0..num_partitions).map(|_| PartitionQueue::new()).collect());
    let states: Arc<Vec<PartitionState>> =
        Arc::new((0..num_partitions).map(|_| PartitionState::new()).collect());
    let pending = Arc::new(AtomicU64::new(0));

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut futures = Vec::new();
    for seq in 0..20u64 {
        let (tx, rx) = oneshot::channel();
        let seen = Arc::clone(&seen);
        states[0].register(
            seq,
            Some(Box::new(move |ok| seen.lock().unwrap().push((seq, ok)))),
        );
        pending.fetch_add(1, Ordering::SeqCst);
        queues[0].push(Request {
            key: encode_key(0, 0, 1, seq),
            payload: format!("entry-{seq}").into_bytes(),
            partition_id: 0,
            seq_num: seq,
            completion: tx,
        });
        futures.push(rx);
    }

    let pool = WorkerPool::spawn(
        2,
        Arc::clone(&queues),
        Arc::clone(&states),
        Arc::clone(&store),
        Arc::clone(&pending),
    );

    let deadline = Instant::now() + Duration::from_secs(5);
    for mut f in futures {
        let result = loop {
            match f.try_recv() {
                Ok(Some(ok)) => break ok,
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(1))
                }
                _ => panic!("write future never resolved"),
            }
        };
        assert!(result);
    }
    assert_eq!(pending.load(Ordering::SeqCst), 0);

    pool.shutdown();

    let expected: Vec<(u64, bool)> = (0..20).map(|i| (i, true)).collect();
    assert_eq!(*seen.lock().unwrap(), expected);
}
