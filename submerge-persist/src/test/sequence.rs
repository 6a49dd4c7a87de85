use crate::sequence::SequenceAllocator;
use std::sync::Arc;
use std::thread;
use test_log::test;

#[test]
fn test_starts_at_zero_and_increments() {
    let alloc = SequenceAllocator::new(1);
    assert_eq!(alloc.next(0), 0);
    assert_eq!(alloc.next(0), 1);
    assert_eq!(alloc.next(0), 2);
}

#[test]
fn test_partitions_are_independent() {
    let alloc = SequenceAllocator::new(2);
    assert_eq!(alloc.next(0), 0);
    assert_eq!(alloc.next(1), 0);
    assert_eq!(alloc.next(0), 1);
    assert_eq!(alloc.next(1), 1);
}

#[test]
fn test_concurrent_allocation_is_unique_and_contiguous() {
    let alloc = Arc::new(SequenceAllocator::new(1));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let alloc = Arc::clone(&alloc);
        handles.push(thread::spawn(move || {
            (0..200).map(move |_| alloc.next(0)).collect::<Vec<_>>()
        }));
    }
    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    let expected: Vec<u64> = (0..1600).collect();
    assert_eq!(all, expected);
}
