//! File-backed queue behaviour: creation, reopen, on-disk format.

use std::fs;

use persistent_queue::{
    BoundsError, PersistentQueue, Pointer, QueueConfig, QueueError, SyncPolicy, TypedQueue,
};
use tempfile::TempDir;

fn scratch() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_fresh_file() {
    let dir = scratch();
    let path = dir.path().join("fresh.pq");

    let mut q = PersistentQueue::open(&path, QueueConfig::new(1024, 5)).unwrap();
    assert_eq!(q.capacity(), (1024 - 18) / 5);
    assert_eq!(q.len(), 0);
    assert!(q.is_empty());
    assert!(matches!(q.head(), Err(QueueError::QueueIsEmpty)));
    assert!(matches!(q.pop(), Err(QueueError::QueueIsEmpty)));
    drop(q);

    // Only the zeroed metadata region exists until something is put.
    assert_eq!(fs::read(&path).unwrap(), vec![0u8; 18]);
}

#[test]
fn test_bad_bounds_do_not_create_file() {
    let dir = scratch();
    let path = dir.path().join("never.pq");

    let err = PersistentQueue::open(&path, QueueConfig::new(18, 5)).unwrap_err();
    assert!(matches!(err, QueueError::IncorrectBounds(BoundsError::TooSmall)));

    let err = PersistentQueue::open(&path, QueueConfig::new(6 + 300, 1).with_address_size(1))
        .unwrap_err();
    assert!(matches!(err, QueueError::IncorrectBounds(BoundsError::TooBig)));

    assert!(!path.exists());
}

#[test]
fn test_reopen_is_idempotent() {
    let dir = scratch();
    let path = dir.path().join("reopen.pq");
    let config = QueueConfig::new(18 + 5 * 8, 8);

    let (pointers, len) = {
        let mut q = PersistentQueue::open(&path, config).unwrap();
        for i in 0u64..7 {
            q.put(&i.to_be_bytes()).unwrap();
        }
        q.pop().unwrap();
        let state = (q.pointers(), q.len());
        q.close().unwrap();
        state
    };
    assert_eq!(len, 4);

    for _ in 0..3 {
        let mut q = PersistentQueue::open(&path, config).unwrap();
        assert_eq!(q.pointers(), pointers);
        assert_eq!(q.len(), len);

        let items: Vec<Vec<u8>> = q.iter().collect::<Result<_, _>>().unwrap();
        let expected: Vec<Vec<u8>> = (3u64..7).map(|i| i.to_be_bytes().to_vec()).collect();
        assert_eq!(items, expected);
    }
}

#[test]
fn test_pop_survives_reopen() {
    let dir = scratch();
    let path = dir.path().join("pop.pq");
    let config = QueueConfig::new(18 + 4, 1);

    {
        let mut q = PersistentQueue::open(&path, config).unwrap();
        q.put(b"a").unwrap();
        q.put(b"b").unwrap();
        q.pop().unwrap();
    }

    let mut q = PersistentQueue::open(&path, config).unwrap();
    assert_eq!(q.len(), 1);
    assert_eq!(q.head().unwrap(), b"b");
    q.pop().unwrap();
    drop(q);

    let q = PersistentQueue::open(&path, config).unwrap();
    assert!(q.is_empty());
    // Stale tail stays on disk.
    assert_eq!(q.pointers(), (Pointer::Empty, Pointer::At(1)));
}

#[test]
fn test_on_disk_layout() {
    let dir = scratch();
    let path = dir.path().join("layout.pq");

    let mut q = PersistentQueue::open(&path, QueueConfig::new(18 + 3 * 2, 2)).unwrap();
    q.put(b"AA").unwrap();
    q.put(b"BB").unwrap();
    q.close().unwrap();

    let bytes = fs::read(&path).unwrap();
    #[rustfmt::skip]
    let expected: Vec<u8> = vec![
        // head: selector 1, slot A = 0, slot B untouched
        1, 0, 0, 0, 0, 0, 0, 0, 0,
        // tail: selector 2, slot A = 0, slot B = 1
        2, 0, 0, 0, 0, 0, 0, 0, 1,
        b'A', b'A',
        b'B', b'B',
    ];
    assert_eq!(bytes, expected);
}

#[test]
fn test_file_never_exceeds_max_size() {
    let dir = scratch();
    let path = dir.path().join("bounded.pq");
    let max_file_size = 100;

    let mut q = PersistentQueue::open(&path, QueueConfig::new(max_file_size, 7)).unwrap();
    for i in 0..50u8 {
        q.put(&[i; 7]).unwrap();
    }
    assert!(q.is_full());
    assert_eq!(q.metrics().evictions(), 50 - q.capacity());
    q.close().unwrap();

    assert!(fs::metadata(&path).unwrap().len() <= max_file_size);
}

#[test]
fn test_reopen_with_smaller_capacity_is_rejected() {
    let dir = scratch();
    let path = dir.path().join("shrink.pq");

    {
        let mut q = PersistentQueue::open(&path, QueueConfig::new(18 + 10, 1)).unwrap();
        for _ in 0..8 {
            q.put(b"x").unwrap();
        }
    }

    let err = PersistentQueue::open(&path, QueueConfig::new(18 + 4, 1)).unwrap_err();
    assert!(matches!(err, QueueError::CorruptMetadata { capacity: 4, .. }));
}

#[test]
fn test_sync_policies_agree_on_contents() {
    for policy in [SyncPolicy::Never, SyncPolicy::OnPut, SyncPolicy::Always] {
        let dir = scratch();
        let path = dir.path().join("policy.pq");
        let config = QueueConfig::new(18 + 3, 1).with_sync_policy(policy);

        {
            let mut q = PersistentQueue::open(&path, config).unwrap();
            for v in [b"1", b"2", b"3", b"4"] {
                q.put(v).unwrap();
            }
            q.pop().unwrap();
        }

        let mut q = PersistentQueue::open(&path, config).unwrap();
        assert_eq!(q.pop_front().unwrap(), b"3", "{policy:?}");
        assert_eq!(q.pop_front().unwrap(), b"4", "{policy:?}");
        assert!(q.is_empty());
    }
}

#[test]
fn test_typed_queue_on_file() {
    let dir = scratch();
    let path = dir.path().join("typed.pq");
    let config = QueueConfig::new(18 + 4 * 8, 8);

    {
        let mut q = TypedQueue::<u64>::open(&path, config).unwrap();
        q.put(&11).unwrap();
        q.put(&22).unwrap();
        q.close().unwrap();
    }

    let mut q = TypedQueue::<u64>::open(&path, config).unwrap();
    assert_eq!(q.len(), 2);
    assert_eq!(q.pop_front().unwrap(), 11);
    assert_eq!(q.pop_front().unwrap(), 22);
    assert!(matches!(q.pop_front(), Err(QueueError::QueueIsEmpty)));
}

#[test]
fn test_wide_and_narrow_pointers() {
    for address_size in [1usize, 2, 8] {
        let dir = scratch();
        let path = dir.path().join("width.pq");
        let metadata_size = 2 * (1 + 2 * address_size as u64);
        let config = QueueConfig::new(metadata_size + 5, 1).with_address_size(address_size);

        let mut q = PersistentQueue::open(&path, config).unwrap();
        assert_eq!(q.metadata_size(), metadata_size);
        for v in [b"a", b"b", b"c", b"d", b"e", b"f"] {
            q.put(v).unwrap();
        }
        drop(q);

        let mut q = PersistentQueue::open(&path, config).unwrap();
        assert_eq!(q.len(), 5);
        assert_eq!(q.head().unwrap(), b"b");
    }
}
