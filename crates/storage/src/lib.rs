//! Storage for the attest ledger.
//!
//! Two logical stores live behind one [`LedgerStore`]:
//!
//! - **files**: primary index by id, a unique index by content hash, and an
//!   ordered index by `(expires_at, id)`;
//! - **endorsements**: primary index by id and an ordered index by composite
//!   key (`id + file_id * 2^32`), so one file's endorsements form a
//!   contiguous key range.
//!
//! Each store keeps a persisted monotonic id counter. All mutation goes
//! through [`LedgerStore::commit`], which applies a [`WriteBatch`]
//! atomically: either every op and index update is visible afterwards or
//! none is.

use attest_types::{Digest256, EndorsementRecord, FileRecord};
use std::ops::Bound;

pub mod batch;
pub mod error;
pub mod memory;
pub mod sled_store;

pub use batch::{BatchOp, ExpiryCursor, WriteBatch};
pub use error::{Result, StorageError};
pub use memory::MemoryLedgerStore;
pub use sled_store::SledLedgerStore;

/// Bounds over composite endorsement keys.
pub type KeyBounds = (Bound<u64>, Bound<u64>);

/// True when no key can satisfy `bounds`. Ordered maps panic on inverted
/// ranges, and a stale cursor can produce one.
pub(crate) fn bounds_are_empty(bounds: &KeyBounds) -> bool {
    let start = match bounds.0 {
        Bound::Included(start) => Some((start, false)),
        Bound::Excluded(start) => Some((start, true)),
        Bound::Unbounded => None,
    };
    let end = match bounds.1 {
        Bound::Included(end) => Some((end, false)),
        Bound::Excluded(end) => Some((end, true)),
        Bound::Unbounded => None,
    };
    match (start, end) {
        (Some((start, start_excl)), Some((end, end_excl))) => {
            start > end || (start == end && (start_excl || end_excl))
        }
        _ => false,
    }
}

/// Abstract ledger storage backend.
pub trait LedgerStore: Send + Sync {
    /// Retrieve a file by id.
    fn file(&self, id: u64) -> Result<Option<FileRecord>>;

    /// Retrieve the live file registered under `hash`.
    fn file_by_hash(&self, hash: &Digest256) -> Result<Option<FileRecord>>;

    /// Up to `limit` files in ascending `(expires_at, id)` order, starting
    /// strictly after `after` when given.
    fn files_by_expiry(&self, after: Option<ExpiryCursor>, limit: usize)
        -> Result<Vec<FileRecord>>;

    /// Up to `limit` endorsements whose composite key lies within `bounds`,
    /// ascending by key, paired with that key.
    fn endorsements_in_range(
        &self,
        bounds: KeyBounds,
        limit: usize,
    ) -> Result<Vec<(u64, EndorsementRecord)>>;

    /// Id the next registered file would receive.
    fn next_file_id(&self) -> Result<u64>;

    /// Id the next endorsement would receive.
    fn next_endorsement_id(&self) -> Result<u64>;

    fn file_count(&self) -> Result<u64>;

    fn endorsement_count(&self) -> Result<u64>;

    /// Apply `batch` atomically.
    ///
    /// Fails with [`StorageError::Conflict`] without applying anything if an
    /// op contradicts the stored state: inserting an id or hash that already
    /// exists, or deleting a record that is absent. Id counters advance past
    /// every inserted id and never move back.
    fn commit(&self, batch: WriteBatch) -> Result<()>;
}
