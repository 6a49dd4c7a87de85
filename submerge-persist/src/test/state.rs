use crate::state::PartitionState;
use std::sync::{Arc, Mutex};
use test_log::test;

#[test]
fn test_in_order_completion_releases_immediately() {
    let state = PartitionState::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for seq in 0..5u64 {
        let seen = Arc::clone(&seen);
        state.register(
            seq,
            Some(Box::new(move |ok| seen.lock().unwrap().push((seq, ok)))),
        );
    }
    for seq in 0..5u64 {
        let released = state.complete(seq, true);
        assert_eq!(released.len(), 1);
        (released.into_iter().next().unwrap().callback)(true);
    }
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(0, true), (1, true), (2, true), (3, true), (4, true)]
    );
}

#[test]
fn test_s1_reorder_buffer_correctness() {
    // S1 from spec section 8: one partition, 100 submissions, completions
    // arrive out of order; callbacks must still fire 0, 1, 2, ..., 99.
    let state = PartitionState::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for seq in 0..100u64 {
        let seen = Arc::clone(&seen);
        state.register(
            seq,
            Some(Box::new(move |ok| seen.lock().unwrap().push((seq, ok)))),
        );
    }

    // A fixed shuffle: complete in an order that's neither forward nor
    // backward so the reorder buffer is actually exercised.
    let mut order: Vec<u64> = (0..100).collect();
    order.sort_by_key(|&x| (x * 37 + 11) % 101);

    for seq in order {
        for release in state.complete(seq, true) {
            (release.callback)(release.ok);
        }
    }

    let expected: Vec<(u64, bool)> = (0..100).map(|i| (i, true)).collect();
    assert_eq!(*seen.lock().unwrap(), expected);
}

#[test]
fn test_release_carries_failure_outcome() {
    let state = PartitionState::new();
    let seen = Arc::new(Mutex::new(None));
    {
        let seen = Arc::clone(&seen);
        state.register(
            0,
            Some(Box::new(move |ok| *seen.lock().unwrap() = Some(ok))),
        );
    }
    let released = state.complete(0, false);
    assert_eq!(released.len(), 1);
    assert!(!released[0].ok);
}

#[test]
fn test_pending_count_tracks_registrations_and_releases() {
    let state = PartitionState::new();
    state.register(0, Some(Box::new(|_| {})));
    state.register(1, Some(Box::new(|_| {})));
    assert_eq!(state.pending_count(), 2);
    state.complete(0, true);
    assert_eq!(state.pending_count(), 1);
    state.complete(1, true);
    assert_eq!(state.pending_count(), 0);
}

#[test]
fn test_drain_returns_all_pending_regardless_of_persistence() {
    let state = PartitionState::new();
    state.register(0, Some(Box::new(|_| {})));
    state.register(1, Some(Box::new(|_| {})));
    state.register(2, Some(Box::new(|_| {})));
    // Seq 1 completes but can't release yet: seq 0 hasn't, so nothing
    // is popped from pending_callbacks -- all three are still pending.
    state.complete(1, true);
    let drained = state.drain();
    assert_eq!(drained.len(), 3);
    assert!(drained.iter().all(|r| !r.ok));
}
