//! File registry: registration of content digests.

use crate::error::{LedgerError, Result};
use attest_storage::{LedgerStore, WriteBatch};
use attest_types::{AccountId, Digest256, FileRecord, Timestamp, FILE_ID_LIMIT};
use serde::{Deserialize, Serialize};

/// Request to register a content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Authenticated registrant.
    pub author: AccountId,
    pub hash: Digest256,
    pub filename: String,
    #[serde(default)]
    pub description: String,
}

impl Registration {
    pub fn new(
        author: AccountId,
        hash: Digest256,
        filename: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            author,
            hash,
            filename: filename.into(),
            description: description.into(),
        }
    }
}

/// Validate `registration` against the current store and build the record
/// together with the batch that inserts it. Nothing is written here.
pub(crate) fn prepare<S: LedgerStore>(
    store: &S,
    registration: Registration,
    now: Timestamp,
    submission_ref: Digest256,
) -> Result<(FileRecord, WriteBatch)> {
    if registration.filename.is_empty() {
        return Err(LedgerError::Validation(
            "Filename cannot be empty".to_string(),
        ));
    }

    if store.file_by_hash(&registration.hash)?.is_some() {
        return Err(LedgerError::DuplicateHash {
            hash: registration.hash,
        });
    }

    let id = store.next_file_id()?;
    if id >= FILE_ID_LIMIT {
        return Err(LedgerError::Capacity(format!(
            "cannot register more than {FILE_ID_LIMIT} files (next id {id})"
        )));
    }

    let file = FileRecord {
        id,
        author: registration.author,
        filename: registration.filename,
        description: registration.description,
        hash: registration.hash,
        submission_ref,
        added_at: now,
        expires_at: FileRecord::expiry_for(now),
    };

    let mut batch = WriteBatch::new();
    batch.put_file(file.clone());
    Ok((file, batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_storage::MemoryLedgerStore;
    use attest_types::RETENTION_SECS;

    fn registration(seed: &str) -> Registration {
        Registration::new(
            AccountId([1u8; 32]),
            Digest256::blake3(seed.as_bytes()),
            format!("{seed}.txt"),
            "",
        )
    }

    #[test]
    fn assigns_next_id_and_expiry() {
        let store = MemoryLedgerStore::with_next_ids(5, 0);
        let (file, batch) =
            prepare(&store, registration("a"), Timestamp(100), Digest256([9u8; 32])).unwrap();
        assert_eq!(file.id, 5);
        assert_eq!(file.added_at, Timestamp(100));
        assert_eq!(file.expires_at, Timestamp(100 + RETENTION_SECS));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn empty_filename_is_checked_first() {
        let store = MemoryLedgerStore::with_next_ids(FILE_ID_LIMIT, 0);
        let mut req = registration("a");
        req.filename.clear();
        let err = prepare(&store, req, Timestamp(1), Digest256([0u8; 32])).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
