//! Endorsement ledger: accounts vouching for registered digests.

use crate::error::{LedgerError, Result};
use attest_storage::{LedgerStore, WriteBatch};
use attest_types::{
    composite_key, AccountId, Digest256, EndorsementRecord, FileRecord, Timestamp,
    ENDORSEMENT_ID_LIMIT, MAX_ENDORSEMENTS_PER_FILE,
};
use serde::{Deserialize, Serialize};
use std::ops::Bound;

/// Request to endorse a registered digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    /// Authenticated endorser.
    pub signer: AccountId,
    pub hash: Digest256,
}

impl Endorsement {
    pub fn new(signer: AccountId, hash: Digest256) -> Self {
        Self { signer, hash }
    }
}

/// Walk the file's composite-key range once, rejecting a repeat signer and
/// counting existing entries. The range never holds more than the cap, so
/// the walk is bounded.
fn check_existing<S: LedgerStore>(
    store: &S,
    file: &FileRecord,
    signer: &AccountId,
) -> Result<usize> {
    let range = file.endorsement_range()?;
    let existing = store.endorsements_in_range(
        (Bound::Included(*range.start()), Bound::Included(*range.end())),
        MAX_ENDORSEMENTS_PER_FILE + 1,
    )?;

    let mut count = 0;
    for (_, endorsement) in existing
        .iter()
        .take_while(|(_, endorsement)| endorsement.file_id == file.id)
    {
        if endorsement.signed_by == *signer {
            return Err(LedgerError::DuplicateEndorsement {
                signer: *signer,
                hash: file.hash,
            });
        }
        count += 1;
    }
    Ok(count)
}

/// Validate `endorsement` against the current store and build the record
/// together with the batch that inserts it. Nothing is written here.
pub(crate) fn prepare<S: LedgerStore>(
    store: &S,
    endorsement: Endorsement,
    now: Timestamp,
    submission_ref: Digest256,
) -> Result<(EndorsementRecord, WriteBatch)> {
    let file = store
        .file_by_hash(&endorsement.hash)?
        .ok_or(LedgerError::NotFound {
            hash: endorsement.hash,
        })?;

    if file.author == endorsement.signer {
        return Err(LedgerError::SelfEndorsement {
            account: endorsement.signer,
            hash: file.hash,
        });
    }

    let count = check_existing(store, &file, &endorsement.signer)?;
    if count >= MAX_ENDORSEMENTS_PER_FILE {
        return Err(LedgerError::QuotaExceeded {
            hash: file.hash,
            max: MAX_ENDORSEMENTS_PER_FILE,
        });
    }

    let id = store.next_endorsement_id()?;
    if id >= ENDORSEMENT_ID_LIMIT {
        return Err(LedgerError::Capacity(format!(
            "cannot record more than {ENDORSEMENT_ID_LIMIT} endorsements (next id {id})"
        )));
    }
    composite_key::encode(file.id, id)?;

    let record = EndorsementRecord {
        id,
        file_id: file.id,
        signed_by: endorsement.signer,
        submission_ref,
        signed_at: now,
    };

    let mut batch = WriteBatch::new();
    batch.put_endorsement(record.clone());
    Ok((record, batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_storage::MemoryLedgerStore;

    fn seeded_store(next_endorsement_id: u64) -> (MemoryLedgerStore, FileRecord) {
        let store = MemoryLedgerStore::with_next_ids(0, next_endorsement_id);
        let file = FileRecord {
            id: 0,
            author: AccountId([1u8; 32]),
            filename: "a.txt".into(),
            description: String::new(),
            hash: Digest256::blake3(b"a"),
            submission_ref: Digest256([0u8; 32]),
            added_at: Timestamp(10),
            expires_at: FileRecord::expiry_for(Timestamp(10)),
        };
        let mut batch = WriteBatch::new();
        batch.put_file(file.clone());
        store.commit(batch).unwrap();
        (store, file)
    }

    #[test]
    fn builds_record_scoped_to_file() {
        let (store, file) = seeded_store(0);
        let (record, batch) = prepare(
            &store,
            Endorsement::new(AccountId([2u8; 32]), file.hash),
            Timestamp(20),
            Digest256([3u8; 32]),
        )
        .unwrap();
        assert_eq!(record.file_id, file.id);
        assert_eq!(record.signed_at, Timestamp(20));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn exhausted_endorsement_ids_are_rejected() {
        let (store, file) = seeded_store(ENDORSEMENT_ID_LIMIT);
        let err = prepare(
            &store,
            Endorsement::new(AccountId([2u8; 32]), file.hash),
            Timestamp(20),
            Digest256([3u8; 32]),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Capacity(_)));
    }
}
