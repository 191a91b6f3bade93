use attest_storage::{
    ExpiryCursor, LedgerStore, MemoryLedgerStore, SledLedgerStore, StorageError, WriteBatch,
};
use attest_types::{AccountId, Digest256, EndorsementRecord, FileRecord, Timestamp};
use std::ops::Bound;
use tempfile::TempDir;

fn file(id: u64, added_at: u64) -> FileRecord {
    FileRecord {
        id,
        author: AccountId([id as u8; 32]),
        filename: format!("file-{id}.txt"),
        description: String::new(),
        hash: Digest256::blake3(&id.to_le_bytes()),
        submission_ref: Digest256([0u8; 32]),
        added_at: Timestamp(added_at),
        expires_at: FileRecord::expiry_for(Timestamp(added_at)),
    }
}

fn endorsement(id: u64, file_id: u64, signer: u8) -> EndorsementRecord {
    EndorsementRecord {
        id,
        file_id,
        signed_by: AccountId([signer; 32]),
        submission_ref: Digest256([1u8; 32]),
        signed_at: Timestamp(0),
    }
}

/// Applies the same history to a store: files with colliding expiries,
/// endorsements interleaved across files, then a cascade delete.
fn apply_history<S: LedgerStore>(store: &S) {
    let mut batch = WriteBatch::new();
    batch
        .put_file(file(0, 500))
        .put_file(file(1, 100))
        .put_file(file(2, 500))
        .put_file(file(3, 300));
    store.commit(batch).unwrap();

    let mut batch = WriteBatch::new();
    for (id, (file_id, signer)) in [(2, 10), (0, 11), (2, 12), (3, 13), (0, 14)]
        .into_iter()
        .enumerate()
    {
        batch.put_endorsement(endorsement(id as u64, file_id, signer));
    }
    store.commit(batch).unwrap();

    let mut batch = WriteBatch::new();
    batch
        .delete_endorsement(endorsement(3, 3, 13))
        .delete_file(file(3, 300));
    store.commit(batch).unwrap();
}

#[derive(Debug, PartialEq)]
struct Snapshot {
    by_expiry: Vec<u64>,
    endorsement_keys: Vec<u64>,
    file_two: Vec<u64>,
    hash_lookup: Option<u64>,
    counters: (u64, u64),
    counts: (u64, u64),
}

fn snapshot<S: LedgerStore>(store: &S) -> Snapshot {
    let file_two = file(2, 500).endorsement_range().unwrap();
    Snapshot {
        by_expiry: store
            .files_by_expiry(None, 100)
            .unwrap()
            .iter()
            .map(|f| f.id)
            .collect(),
        endorsement_keys: store
            .endorsements_in_range((Bound::Unbounded, Bound::Unbounded), 100)
            .unwrap()
            .into_iter()
            .map(|(key, _)| key)
            .collect(),
        file_two: store
            .endorsements_in_range(
                (
                    Bound::Included(*file_two.start()),
                    Bound::Included(*file_two.end()),
                ),
                100,
            )
            .unwrap()
            .into_iter()
            .map(|(_, e)| e.id)
            .collect(),
        hash_lookup: store
            .file_by_hash(&file(2, 500).hash)
            .unwrap()
            .map(|f| f.id),
        counters: (
            store.next_file_id().unwrap(),
            store.next_endorsement_id().unwrap(),
        ),
        counts: (
            store.file_count().unwrap(),
            store.endorsement_count().unwrap(),
        ),
    }
}

#[test]
fn memory_and_sled_agree() {
    let memory = MemoryLedgerStore::new();
    let dir = TempDir::new().expect("temp dir");
    let sled = SledLedgerStore::open(dir.path()).unwrap();

    apply_history(&memory);
    apply_history(&sled);

    let expected = Snapshot {
        by_expiry: vec![1, 0, 2],
        endorsement_keys: vec![1, 4, 2 << 32, (2 << 32) + 2],
        file_two: vec![0, 2],
        hash_lookup: Some(2),
        counters: (4, 5),
        counts: (3, 4),
    };
    assert_eq!(snapshot(&memory), expected);
    assert_eq!(snapshot(&sled), expected);
}

#[test]
fn expiry_cursor_resumes_identically() {
    let memory = MemoryLedgerStore::new();
    let sled = SledLedgerStore::temporary().unwrap();
    apply_history(&memory);
    apply_history(&sled);

    let cursor = ExpiryCursor::of(&file(0, 500));
    let from_memory: Vec<u64> = memory
        .files_by_expiry(Some(cursor), 10)
        .unwrap()
        .iter()
        .map(|f| f.id)
        .collect();
    let from_sled: Vec<u64> = sled
        .files_by_expiry(Some(cursor), 10)
        .unwrap()
        .iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(from_memory, vec![2]);
    assert_eq!(from_sled, from_memory);
}

#[test]
fn conflicting_batches_fail_the_same_way() {
    fn check<S: LedgerStore>(store: &S) {
        apply_history(store);
        let before = snapshot(store);

        // Reuses a live hash under a fresh id.
        let mut clash = file(9, 0);
        clash.hash = file(0, 500).hash;
        let mut batch = WriteBatch::new();
        batch.put_file(file(8, 0)).put_file(clash);
        assert!(matches!(store.commit(batch), Err(StorageError::Conflict(_))));

        let mut batch = WriteBatch::new();
        batch
            .put_endorsement(endorsement(20, 1, 30))
            .delete_file(file(3, 300));
        assert!(matches!(store.commit(batch), Err(StorageError::Conflict(_))));

        assert_eq!(snapshot(store), before);
    }

    check(&MemoryLedgerStore::new());
    check(&SledLedgerStore::temporary().unwrap());
}

#[test]
fn inverted_bounds_yield_nothing() {
    fn check<S: LedgerStore>(store: &S) {
        apply_history(store);
        let rows = store
            .endorsements_in_range((Bound::Excluded(10), Bound::Included(5)), 10)
            .unwrap();
        assert!(rows.is_empty());
    }

    check(&MemoryLedgerStore::new());
    check(&SledLedgerStore::temporary().unwrap());
}
