//! Sled-backed ledger storage.
//!
//! Layout (one tree per index, big-endian integer keys so byte order is
//! numeric order):
//!
//! | tree                   | key                        | value            |
//! |------------------------|----------------------------|------------------|
//! | `files`                | file id                    | JSON `FileRecord`|
//! | `files_by_hash`        | 32-byte hash               | file id          |
//! | `files_by_expiry`      | `expires_at ++ id`         | empty            |
//! | `endorsements`         | endorsement id             | JSON record      |
//! | `endorsements_by_file` | composite key              | endorsement id   |
//! | `meta`                 | counter name               | u64              |
//!
//! A commit runs as one multi-tree sled transaction.

use crate::batch::{BatchOp, ExpiryCursor, WriteBatch};
use crate::error::{Result, StorageError};
use crate::{KeyBounds, LedgerStore};
use attest_types::{Digest256, EndorsementRecord, FileRecord};
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use sled::{Db, IVec, Transactional, Tree};
use std::ops::Bound;
use std::path::Path;

const FILES_TREE: &str = "files";
const FILES_BY_HASH_TREE: &str = "files_by_hash";
const FILES_BY_EXPIRY_TREE: &str = "files_by_expiry";
const ENDORSEMENTS_TREE: &str = "endorsements";
const ENDORSEMENTS_BY_FILE_TREE: &str = "endorsements_by_file";
const META_TREE: &str = "meta";

const NEXT_FILE_ID_KEY: &[u8] = b"next_file_id";
const NEXT_ENDORSEMENT_ID_KEY: &[u8] = b"next_endorsement_id";

/// Sled-backed implementation
pub struct SledLedgerStore {
    db: Db,
    files: Tree,
    files_by_hash: Tree,
    files_by_expiry: Tree,
    endorsements: Tree,
    endorsements_by_file: Tree,
    meta: Tree,
}

/// A batch op with its records serialized ahead of the transaction, so the
/// transaction body (which sled may retry) only touches bytes.
enum EncodedOp {
    PutFile {
        id: [u8; 8],
        hash: [u8; 32],
        expiry: [u8; 16],
        data: Vec<u8>,
    },
    DeleteFile {
        id: [u8; 8],
    },
    PutEndorsement {
        id: [u8; 8],
        key: [u8; 8],
        data: Vec<u8>,
    },
    DeleteEndorsement {
        id: [u8; 8],
    },
}

impl SledLedgerStore {
    /// Open (or create) a store at the provided filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        let store = Self::from_db(db)?;
        tracing::debug!(
            path = %path.display(),
            files = store.files.len(),
            endorsements = store.endorsements.len(),
            "opened sled ledger store"
        );
        Ok(store)
    }

    /// Open a throwaway store that is deleted when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let files = db.open_tree(FILES_TREE)?;
        let files_by_hash = db.open_tree(FILES_BY_HASH_TREE)?;
        let files_by_expiry = db.open_tree(FILES_BY_EXPIRY_TREE)?;
        let endorsements = db.open_tree(ENDORSEMENTS_TREE)?;
        let endorsements_by_file = db.open_tree(ENDORSEMENTS_BY_FILE_TREE)?;
        let meta = db.open_tree(META_TREE)?;

        Ok(Self {
            db,
            files,
            files_by_hash,
            files_by_expiry,
            endorsements,
            endorsements_by_file,
            meta,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn read_counter(&self, key: &[u8]) -> Result<u64> {
        match self.meta.get(key)? {
            Some(v) => decode_u64(&v),
            None => Ok(0),
        }
    }

    fn load_file(&self, id: &[u8]) -> Result<Option<FileRecord>> {
        self.files
            .get(id)?
            .map(|v| serde_json::from_slice(&v))
            .transpose()
            .map_err(Into::into)
    }

    fn load_endorsement(&self, id: &[u8]) -> Result<Option<EndorsementRecord>> {
        self.endorsements
            .get(id)?
            .map(|v| serde_json::from_slice(&v))
            .transpose()
            .map_err(Into::into)
    }

    fn encode(op: &BatchOp) -> Result<EncodedOp> {
        Ok(match op {
            BatchOp::PutFile(file) => EncodedOp::PutFile {
                id: file.id.to_be_bytes(),
                hash: *file.hash.as_bytes(),
                expiry: ExpiryCursor::of(file).to_key(),
                data: serde_json::to_vec(file)?,
            },
            BatchOp::DeleteFile(file) => EncodedOp::DeleteFile {
                id: file.id.to_be_bytes(),
            },
            BatchOp::PutEndorsement(endorsement) => EncodedOp::PutEndorsement {
                id: endorsement.id.to_be_bytes(),
                key: endorsement.composite_key()?.to_be_bytes(),
                data: serde_json::to_vec(endorsement)?,
            },
            BatchOp::DeleteEndorsement(endorsement) => EncodedOp::DeleteEndorsement {
                id: endorsement.id.to_be_bytes(),
            },
        })
    }
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::Corrupt(format!("expected 8 byte integer, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

fn abort<T>(message: String) -> std::result::Result<T, ConflictableTransactionError<StorageError>> {
    Err(ConflictableTransactionError::Abort(StorageError::Conflict(message)))
}

fn abort_corrupt<T>(
    message: String,
) -> std::result::Result<T, ConflictableTransactionError<StorageError>> {
    Err(ConflictableTransactionError::Abort(StorageError::Corrupt(message)))
}

fn tx_counter(
    meta: &TransactionalTree,
    key: &[u8],
) -> std::result::Result<u64, ConflictableTransactionError<StorageError>> {
    match meta.get(key)? {
        Some(v) => match decode_u64(&v) {
            Ok(value) => Ok(value),
            Err(err) => Err(ConflictableTransactionError::Abort(err)),
        },
        None => Ok(0),
    }
}

fn to_bounds(bounds: KeyBounds) -> (Bound<[u8; 8]>, Bound<[u8; 8]>) {
    let map = |bound: Bound<u64>| match bound {
        Bound::Included(v) => Bound::Included(v.to_be_bytes()),
        Bound::Excluded(v) => Bound::Excluded(v.to_be_bytes()),
        Bound::Unbounded => Bound::Unbounded,
    };
    (map(bounds.0), map(bounds.1))
}

impl LedgerStore for SledLedgerStore {
    fn file(&self, id: u64) -> Result<Option<FileRecord>> {
        self.load_file(&id.to_be_bytes())
    }

    fn file_by_hash(&self, hash: &Digest256) -> Result<Option<FileRecord>> {
        match self.files_by_hash.get(hash.as_bytes())? {
            Some(id) => self.load_file(&id),
            None => Ok(None),
        }
    }

    fn files_by_expiry(
        &self,
        after: Option<ExpiryCursor>,
        limit: usize,
    ) -> Result<Vec<FileRecord>> {
        let lower = match after {
            Some(cursor) => Bound::Excluded(cursor.to_key()),
            None => Bound::Unbounded,
        };

        let mut results = Vec::new();
        for entry in self
            .files_by_expiry
            .range::<[u8; 16], _>((lower, Bound::Unbounded))
            .take(limit)
        {
            let (key, _) = entry?;
            let cursor = ExpiryCursor::from_key(&key)
                .ok_or_else(|| StorageError::Corrupt("malformed expiry key".to_string()))?;
            let file = self.file(cursor.id)?.ok_or_else(|| {
                StorageError::Corrupt(format!("expiry entry for missing file {}", cursor.id))
            })?;
            results.push(file);
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

        let mut results = Vec::new();
        for entry in self
            .endorsements_by_file
            .range(to_bounds(bounds))
            .take(limit)
        {
            let (key, id): (IVec, IVec) = entry?;
            let key = decode_u64(&key)?;
            let endorsement = self.load_endorsement(&id)?.ok_or_else(|| {
                StorageError::Corrupt(format!("key {key} points at missing endorsement"))
            })?;
            results.push((key, endorsement));
        }
        Ok(results)
    }

    fn next_file_id(&self) -> Result<u64> {
        self.read_counter(NEXT_FILE_ID_KEY)
    }

    fn next_endorsement_id(&self) -> Result<u64> {
        self.read_counter(NEXT_ENDORSEMENT_ID_KEY)
    }

    fn file_count(&self) -> Result<u64> {
        Ok(self.files.len() as u64)
    }

    fn endorsement_count(&self) -> Result<u64> {
        Ok(self.endorsements.len() as u64)
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let encoded = batch
            .ops()
            .iter()
            .map(Self::encode)
            .collect::<Result<Vec<_>>>()?;

        let result = (
            &self.files,
            &self.files_by_hash,
            &self.files_by_expiry,
            &self.endorsements,
            &self.endorsements_by_file,
            &self.meta,
        )
            .transaction(
                |(files, by_hash, by_expiry, endorsements, by_file, meta)| {
                    let mut next_file_id = tx_counter(meta, NEXT_FILE_ID_KEY)?;
                    let mut next_endorsement_id = tx_counter(meta, NEXT_ENDORSEMENT_ID_KEY)?;

                    for op in &encoded {
                        match op {
                            EncodedOp::PutFile {
                                id,
                                hash,
                                expiry,
                                data,
                            } => {
                                if files.get(id)?.is_some() {
                                    return abort(format!(
                                        "file id {} already stored",
                                        u64::from_be_bytes(*id)
                                    ));
                                }
                                if by_hash.get(hash)?.is_some() {
                                    return abort(format!(
                                        "hash {} already stored",
                                        hex::encode(hash)
                                    ));
                                }
                                files.insert(&id[..], data.as_slice())?;
                                by_hash.insert(&hash[..], &id[..])?;
                                by_expiry.insert(&expiry[..], &[] as &[u8])?;
                                next_file_id =
                                    next_file_id.max(u64::from_be_bytes(*id).saturating_add(1));
                            }
                            EncodedOp::DeleteFile { id } => {
                                let stored = match files.remove(&id[..])? {
                                    Some(stored) => stored,
                                    None => {
                                        return abort(format!(
                                            "file id {} not stored",
                                            u64::from_be_bytes(*id)
                                        ))
                                    }
                                };
                                let file: FileRecord = match serde_json::from_slice(&stored) {
                                    Ok(file) => file,
                                    Err(err) => return abort_corrupt(err.to_string()),
                                };
                                by_hash.remove(&file.hash.as_bytes()[..])?;
                                by_expiry.remove(&ExpiryCursor::of(&file).to_key()[..])?;
                            }
                            EncodedOp::PutEndorsement { id, key, data } => {
                                if endorsements.get(id)?.is_some() {
                                    return abort(format!(
                                        "endorsement id {} already stored",
                                        u64::from_be_bytes(*id)
                                    ));
                                }
                                endorsements.insert(&id[..], data.as_slice())?;
                                by_file.insert(&key[..], &id[..])?;
                                next_endorsement_id = next_endorsement_id
                                    .max(u64::from_be_bytes(*id).saturating_add(1));
                            }
                            EncodedOp::DeleteEndorsement { id } => {
                                let stored = match endorsements.remove(&id[..])? {
                                    Some(stored) => stored,
                                    None => {
                                        return abort(format!(
                                            "endorsement id {} not stored",
                                            u64::from_be_bytes(*id)
                                        ))
                                    }
                                };
                                let endorsement: EndorsementRecord =
                                    match serde_json::from_slice(&stored) {
                                        Ok(endorsement) => endorsement,
                                        Err(err) => return abort_corrupt(err.to_string()),
                                    };
                                let key = match endorsement.composite_key() {
                                    Ok(key) => key,
                                    Err(err) => return abort_corrupt(err.to_string()),
                                };
                                by_file.remove(&key.to_be_bytes()[..])?;
                            }
                        }
                    }

                    meta.insert(NEXT_FILE_ID_KEY, &next_file_id.to_be_bytes()[..])?;
                    meta.insert(
                        NEXT_ENDORSEMENT_ID_KEY,
                        &next_endorsement_id.to_be_bytes()[..],
                    )?;
                    Ok(())
                },
            );

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(StorageError::Database(err)),
        }
    }
}
