//! Expiration sweeper: bounded eviction of files past their retention window.

use crate::error::{LedgerError, Result};
use attest_storage::{LedgerStore, WriteBatch};
use attest_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::ops::Bound;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Evicted file ids in eviction order (earliest expiry first).
    pub evicted_files: Vec<u64>,
    /// Endorsements removed along with those files.
    pub evicted_endorsements: usize,
}

impl SweepReport {
    /// Number of evicted files.
    pub fn evicted_count(&self) -> usize {
        self.evicted_files.len()
    }
}

/// Plan the eviction of up to `max_count` expired files, earliest expiry
/// first, cascading to every endorsement in each file's key range.
///
/// Fails with [`LedgerError::NothingToDo`] when nothing qualifies. Nothing
/// is written here; the caller commits the returned batch.
pub(crate) fn prepare<S: LedgerStore>(
    store: &S,
    max_count: u16,
    now: Timestamp,
) -> Result<(SweepReport, WriteBatch)> {
    let mut report = SweepReport::default();
    let mut batch = WriteBatch::new();

    if max_count > 0 {
        let candidates = store.files_by_expiry(None, usize::from(max_count))?;
        for file in candidates {
            if !file.is_expired(now) {
                break;
            }

            let range = file.endorsement_range()?;
            let endorsements = store.endorsements_in_range(
                (Bound::Included(*range.start()), Bound::Included(*range.end())),
                usize::MAX,
            )?;
            for (_, endorsement) in endorsements {
                batch.delete_endorsement(endorsement);
                report.evicted_endorsements += 1;
            }

            report.evicted_files.push(file.id);
            batch.delete_file(file);
        }
    }

    if report.evicted_files.is_empty() {
        return Err(LedgerError::NothingToDo);
    }
    Ok((report, batch))
}
