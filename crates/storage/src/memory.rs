//! In-memory ledger storage (for testing and ephemeral deployments).

use crate::batch::{BatchOp, ExpiryCursor, WriteBatch};
use crate::error::{Result, StorageError};
use crate::{KeyBounds, LedgerStore};
use attest_types::{Digest256, EndorsementRecord, FileRecord};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;

/// In-memory ledger storage.
///
/// Every index lives behind a single lock so a commit is applied under one
/// write guard; readers never observe a half-applied batch.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    /// Primary index: id -> file
    files: HashMap<u64, FileRecord>,

    /// Unique index: hash -> file id
    by_hash: HashMap<Digest256, u64>,

    /// Ordered index for the sweeper
    by_expiry: BTreeSet<ExpiryCursor>,

    /// Primary index: id -> endorsement
    endorsements: HashMap<u64, EndorsementRecord>,

    /// Ordered index: composite key -> endorsement id
    by_file: BTreeMap<u64, u64>,

    next_file_id: u64,
    next_endorsement_id: u64,
}

/// Inverse of an applied op, replayed in reverse order when a later op in
/// the same batch fails.
enum Undo {
    InsertedFile(FileRecord),
    RemovedFile(FileRecord),
    InsertedEndorsement(EndorsementRecord, u64),
    RemovedEndorsement(EndorsementRecord, u64),
}

impl MemoryLedgerStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose id counters start at the given values.
    ///
    /// Lets callers exercise id-space exhaustion without inserting billions
    /// of records.
    pub fn with_next_ids(next_file_id: u64, next_endorsement_id: u64) -> Self {
        let store = Self::new();
        {
            let mut state = store.inner.write();
            state.next_file_id = next_file_id;
            state.next_endorsement_id = next_endorsement_id;
        }
        store
    }
}

impl MemoryState {
    fn apply(&mut self, op: BatchOp) -> Result<Undo> {
        match op {
            BatchOp::PutFile(file) => {
                if self.files.contains_key(&file.id) {
                    return Err(StorageError::Conflict(format!(
                        "file id {} already stored",
                        file.id
                    )));
                }
                if self.by_hash.contains_key(&file.hash) {
                    return Err(StorageError::Conflict(format!(
                        "hash {} already stored",
                        file.hash
                    )));
                }
                self.by_hash.insert(file.hash, file.id);
                self.by_expiry.insert(ExpiryCursor::of(&file));
                self.files.insert(file.id, file.clone());
                Ok(Undo::InsertedFile(file))
            }
            BatchOp::DeleteFile(file) => {
                let stored = self.files.remove(&file.id).ok_or_else(|| {
                    StorageError::Conflict(format!("file id {} not stored", file.id))
                })?;
                self.by_hash.remove(&stored.hash);
                self.by_expiry.remove(&ExpiryCursor::of(&stored));
                Ok(Undo::RemovedFile(stored))
            }
            BatchOp::PutEndorsement(endorsement) => {
                let key = endorsement.composite_key()?;
                if self.endorsements.contains_key(&endorsement.id) {
                    return Err(StorageError::Conflict(format!(
                        "endorsement id {} already stored",
                        endorsement.id
                    )));
                }
                self.by_file.insert(key, endorsement.id);
                self.endorsements
                    .insert(endorsement.id, endorsement.clone());
                Ok(Undo::InsertedEndorsement(endorsement, key))
            }
            BatchOp::DeleteEndorsement(endorsement) => {
                let stored = self.endorsements.remove(&endorsement.id).ok_or_else(|| {
                    StorageError::Conflict(format!(
                        "endorsement id {} not stored",
                        endorsement.id
                    ))
                })?;
                let key = stored.composite_key()?;
                self.by_file.remove(&key);
                Ok(Undo::RemovedEndorsement(stored, key))
            }
        }
    }

    fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::InsertedFile(file) => {
                self.files.remove(&file.id);
                self.by_hash.remove(&file.hash);
                self.by_expiry.remove(&ExpiryCursor::of(&file));
            }
            Undo::RemovedFile(file) => {
                self.by_hash.insert(file.hash, file.id);
                self.by_expiry.insert(ExpiryCursor::of(&file));
                self.files.insert(file.id, file);
            }
            Undo::InsertedEndorsement(endorsement, key) => {
                self.by_file.remove(&key);
                self.endorsements.remove(&endorsement.id);
            }
            Undo::RemovedEndorsement(endorsement, key) => {
                self.by_file.insert(key, endorsement.id);
                self.endorsements.insert(endorsement.id, endorsement);
            }
        }
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn file(&self, id: u64) -> Result<Option<FileRecord>> {
        Ok(self.inner.read().files.get(&id).cloned())
    }

    fn file_by_hash(&self, hash: &Digest256) -> Result<Option<FileRecord>> {
        let state = self.inner.read();
        Ok(state
            .by_hash
            .get(hash)
            .and_then(|id| state.files.get(id))
            .cloned())
    }

    fn files_by_expiry(
        &self,
        after: Option<ExpiryCursor>,
        limit: usize,
    ) -> Result<Vec<FileRecord>> {
        let state = self.inner.read();
        let lower = match after {
            Some(cursor) => Bound::Excluded(cursor),
            None => Bound::Unbounded,
        };

        let mut results = Vec::new();
        for cursor in state.by_expiry.range((lower, Bound::Unbounded)).take(limit) {
            let file = state.files.get(&cursor.id).ok_or_else(|| {
                StorageError::Corrupt(format!("expiry entry for missing file {}", cursor.id))
            })?;
            results.push(file.clone());
        }
        Ok(results)
    }

    fn endorsements_in_range(
        &self,
        bounds: KeyBounds,
        limit: usize,
    ) -> Result<Vec<(u64, EndorsementRecord)>> {
        if crate::bounds_are_empty(&bounds) {
            return Ok(Vec::new());
        }

        let state = self.inner.read();
        let mut results = Vec::new();
        for (key, id) in state.by_file.range(bounds).take(limit) {
            let endorsement = state.endorsements.get(id).ok_or_else(|| {
                StorageError::Corrupt(format!("key {key} points at missing endorsement {id}"))
            })?;
            results.push((*key, endorsement.clone()));
        }
        Ok(results)
    }

    fn next_file_id(&self) -> Result<u64> {
        Ok(self.inner.read().next_file_id)
    }

    fn next_endorsement_id(&self) -> Result<u64> {
        Ok(self.inner.read().next_endorsement_id)
    }

    fn file_count(&self) -> Result<u64> {
        Ok(self.inner.read().files.len() as u64)
    }

    fn endorsement_count(&self) -> Result<u64> {
        Ok(self.inner.read().endorsements.len() as u64)
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut state = self.inner.write();
        let mut undo_log = Vec::with_capacity(batch.len());
        let mut next_file_id = state.next_file_id;
        let mut next_endorsement_id = state.next_endorsement_id;

        for op in batch.into_ops() {
            match &op {
                BatchOp::PutFile(file) => {
                    next_file_id = next_file_id.max(file.id.saturating_add(1));
                }
                BatchOp::PutEndorsement(endorsement) => {
                    next_endorsement_id =
                        next_endorsement_id.max(endorsement.id.saturating_add(1));
                }
                _ => {}
            }

            match state.apply(op) {
                Ok(undo) => undo_log.push(undo),
                Err(err) => {
                    for undo in undo_log.into_iter().rev() {
                        state.revert(undo);
                    }
                    return Err(err);
                }
            }
        }

        state.next_file_id = next_file_id;
        state.next_endorsement_id = next_endorsement_id;
        Ok(())
    }
}
