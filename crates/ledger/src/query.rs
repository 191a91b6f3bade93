//! Read-side queries with resumable cursors.
//!
//! Every paginated query returns the cursor of its last row when the page is
//! full. Passing that cursor back resumes strictly after the row, so pages
//! stay correct while unrelated records are inserted elsewhere.

use crate::error::{LedgerError, Result};
use attest_storage::{ExpiryCursor, LedgerStore};
use attest_types::{composite_key, EndorsementRecord, FileRecord};
use serde::{Deserialize, Serialize};
use std::ops::Bound;

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    /// Resume point; `None` once the scan is exhausted.
    pub next: Option<C>,
}

impl<T, C> Page<T, C> {
    fn from_items(items: Vec<T>, limit: usize, cursor: impl Fn(&T) -> C) -> Self {
        let next = if limit > 0 && items.len() == limit {
            items.last().map(cursor)
        } else {
            None
        };
        Self { items, next }
    }
}

/// Counts and counters of the two stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub files: u64,
    pub endorsements: u64,
    pub next_file_id: u64,
    pub next_endorsement_id: u64,
}

pub(crate) fn files_by_expiry<S: LedgerStore>(
    store: &S,
    after: Option<ExpiryCursor>,
    limit: usize,
) -> Result<Page<FileRecord, ExpiryCursor>> {
    let items = store.files_by_expiry(after, limit)?;
    Ok(Page::from_items(items, limit, ExpiryCursor::of))
}

pub(crate) fn endorsements_of<S: LedgerStore>(
    store: &S,
    file_id: u64,
    after: Option<u64>,
    limit: usize,
) -> Result<Page<EndorsementRecord, u64>> {
    let range = composite_key::range(file_id)
        .map_err(|err| LedgerError::Validation(err.to_string()))?;
    let lower = match after {
        Some(key) if composite_key::owner_of(key) != file_id => {
            return Err(LedgerError::Validation(format!(
                "cursor {key} belongs to file {}, not {file_id}",
                composite_key::owner_of(key)
            )));
        }
        Some(key) => Bound::Excluded(key),
        None => Bound::Included(*range.start()),
    };

    let rows = store.endorsements_in_range((lower, Bound::Included(*range.end())), limit)?;
    Ok(keyed_page(rows, limit))
}

pub(crate) fn endorsements_by_key<S: LedgerStore>(
    store: &S,
    after: Option<u64>,
    limit: usize,
) -> Result<Page<EndorsementRecord, u64>> {
    let lower = match after {
        Some(key) => Bound::Excluded(key),
        None => Bound::Unbounded,
    };
    let rows = store.endorsements_in_range((lower, Bound::Unbounded), limit)?;
    Ok(keyed_page(rows, limit))
}

fn keyed_page(rows: Vec<(u64, EndorsementRecord)>, limit: usize) -> Page<EndorsementRecord, u64> {
    let next = if limit > 0 && rows.len() == limit {
        rows.last().map(|(key, _)| *key)
    } else {
        None
    };
    Page {
        items: rows.into_iter().map(|(_, endorsement)| endorsement).collect(),
        next,
    }
}

pub(crate) fn stats<S: LedgerStore>(store: &S) -> Result<LedgerStats> {
    Ok(LedgerStats {
        files: store.file_count()?,
        endorsements: store.endorsement_count()?,
        next_file_id: store.next_file_id()?,
        next_endorsement_id: store.next_endorsement_id()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_storage::{MemoryLedgerStore, WriteBatch};
    use attest_types::{AccountId, Digest256, Timestamp};

    fn endorsement(id: u64, file_id: u64) -> EndorsementRecord {
        EndorsementRecord {
            id,
            file_id,
            signed_by: AccountId([id as u8; 32]),
            submission_ref: Digest256([0u8; 32]),
            signed_at: Timestamp(1),
        }
    }

    #[test]
    fn cursor_from_another_file_is_rejected() {
        let store = MemoryLedgerStore::new();
        let mut batch = WriteBatch::new();
        batch
            .put_endorsement(endorsement(0, 1))
            .put_endorsement(endorsement(1, 2))
            .put_endorsement(endorsement(2, 1));
        store.commit(batch).unwrap();

        let page = endorsements_of(&store, 1, None, 1).unwrap();
        let cursor = page.next.unwrap();
        assert_eq!(composite_key::owner_of(cursor), 1);

        let rest = endorsements_of(&store, 1, Some(cursor), 10).unwrap();
        assert_eq!(rest.items.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2]);

        let foreign = composite_key::encode(2, 1).unwrap();
        assert!(matches!(
            endorsements_of(&store, 1, Some(foreign), 10),
            Err(LedgerError::Validation(_))
        ));
    }
}
