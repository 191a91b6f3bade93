//! Ledger record types.

use crate::composite_key::{self, CompositeKeyError};
use crate::{AccountId, Digest256, Timestamp};
use serde::{Deserialize, Serialize};

/// Fixed retention window for registered files (365 days, in seconds).
pub const RETENTION_SECS: u64 = 365 * 24 * 3600;

/// Maximum number of endorsements a single file may carry.
pub const MAX_ENDORSEMENTS_PER_FILE: usize = 16;

/// Exclusive upper bound on file ids. File ids form the owner half of the
/// endorsement composite key and must fit in 32 bits.
pub const FILE_ID_LIMIT: u64 = composite_key::OWNER_MULTIPLIER;

/// Exclusive upper bound on endorsement ids (the local half of the key).
pub const ENDORSEMENT_ID_LIMIT: u64 = composite_key::OWNER_MULTIPLIER;

/// A registered content digest with its metadata.
///
/// Records are immutable once created and only disappear when the sweeper
/// evicts them after `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Monotonic id, strictly below [`FILE_ID_LIMIT`].
    pub id: u64,

    /// Account that registered the digest.
    pub author: AccountId,

    /// Non-empty display name.
    pub filename: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Content digest, unique among live records.
    pub hash: Digest256,

    /// Digest of the operation that created this record.
    pub submission_ref: Digest256,

    pub added_at: Timestamp,

    /// Always `added_at + RETENTION_SECS`.
    pub expires_at: Timestamp,
}

impl FileRecord {
    /// Expiry for a file registered at `added_at`.
    pub fn expiry_for(added_at: Timestamp) -> Timestamp {
        added_at.plus_secs(RETENTION_SECS)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Composite-key interval holding this file's endorsements.
    pub fn endorsement_range(&self) -> Result<std::ops::RangeInclusive<u64>, CompositeKeyError> {
        composite_key::range(self.id)
    }
}

/// One account vouching for a registered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementRecord {
    /// Ledger-wide monotonic id (not per file).
    pub id: u64,

    /// Id of the endorsed [`FileRecord`].
    pub file_id: u64,

    /// Endorsing account; never the file's author.
    pub signed_by: AccountId,

    /// Digest of the operation that created this record.
    pub submission_ref: Digest256,

    pub signed_at: Timestamp,
}

impl EndorsementRecord {
    /// Secondary key grouping this record under its file.
    pub fn composite_key(&self) -> Result<u64, CompositeKeyError> {
        composite_key::encode(self.file_id, self.id)
    }
}
