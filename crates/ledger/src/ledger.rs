//! Serialized entry point for ledger operations.

use crate::endorsement::{self, Endorsement};
use crate::error::{LedgerError, Result};
use crate::query::{self, LedgerStats, Page};
use crate::registry::{self, Registration};
use crate::sweeper::{self, SweepReport};
use attest_storage::{ExpiryCursor, LedgerStore};
use attest_types::{Digest256, EndorsementRecord, FileRecord, Timestamp};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// Content-attestation ledger over a [`LedgerStore`].
///
/// `register`, `endorse` and `sweep_expired` each hold the lock exclusively
/// for their whole duration: the reads that establish preconditions and the
/// batch commit happen under it, so concurrent callers cannot interleave
/// and race past the hash-uniqueness or endorsement-cap checks. Validation
/// completes before the single atomic commit, so a refused operation
/// changes nothing.
///
/// Read queries share the lock. An index scan and the record loads behind
/// it therefore see one committed state, never a sweep half applied.
pub struct Ledger<S> {
    store: S,
    lock: RwLock<()>,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: RwLock::new(()),
        }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a content digest on behalf of an authenticated author.
    pub fn register(
        &self,
        registration: Registration,
        now: Timestamp,
        submission_ref: Digest256,
    ) -> Result<FileRecord> {
        let _guard = self.lock.write();
        let hash = registration.hash;

        let outcome = registry::prepare(&self.store, registration, now, submission_ref)
            .and_then(|(file, batch)| {
                self.store.commit(batch)?;
                Ok(file)
            });

        match &outcome {
            Ok(file) => info!(
                id = file.id,
                hash = %file.hash,
                author = %file.author,
                expires_at = %file.expires_at,
                "registered file"
            ),
            Err(err) => log_failure("register", &hash, err),
        }
        outcome
    }

    /// Record an endorsement of a registered digest by an authenticated signer.
    pub fn endorse(
        &self,
        request: Endorsement,
        now: Timestamp,
        submission_ref: Digest256,
    ) -> Result<EndorsementRecord> {
        let _guard = self.lock.write();
        let hash = request.hash;

        let outcome = endorsement::prepare(&self.store, request, now, submission_ref)
            .and_then(|(record, batch)| {
                self.store.commit(batch)?;
                Ok(record)
            });

        match &outcome {
            Ok(record) => info!(
                id = record.id,
                file_id = record.file_id,
                signer = %record.signed_by,
                "recorded endorsement"
            ),
            Err(err) => log_failure("endorse", &hash, err),
        }
        outcome
    }

    /// Evict up to `max_count` expired files and their endorsements.
    ///
    /// Returns the number of evicted files. Fails with
    /// [`LedgerError::NothingToDo`] when no file has expired by `now`.
    pub fn sweep_expired(&self, max_count: u16, now: Timestamp) -> Result<usize> {
        self.sweep_expired_with_report(max_count, now)
            .map(|report| report.evicted_count())
    }

    /// Like [`Ledger::sweep_expired`] but returns the full report.
    pub fn sweep_expired_with_report(&self, max_count: u16, now: Timestamp) -> Result<SweepReport> {
        let _guard = self.lock.write();

        let outcome = sweeper::prepare(&self.store, max_count, now).and_then(|(report, batch)| {
            self.store.commit(batch)?;
            Ok(report)
        });

        match &outcome {
            Ok(report) => {
                info!(
                    files = report.evicted_count(),
                    endorsements = report.evicted_endorsements,
                    max_count,
                    now = %now,
                    "swept expired files"
                );
                debug!(ids = ?report.evicted_files, "evicted file ids");
            }
            Err(LedgerError::NothingToDo) => debug!(now = %now, "sweep found no expired files"),
            Err(err) => warn!(error = %err, "sweep failed"),
        }
        outcome
    }

    /// Live file registered under `hash`.
    pub fn file_by_hash(&self, hash: &Digest256) -> Result<Option<FileRecord>> {
        let _guard = self.lock.read();
        Ok(self.store.file_by_hash(hash)?)
    }

    pub fn file(&self, id: u64) -> Result<Option<FileRecord>> {
        let _guard = self.lock.read();
        Ok(self.store.file(id)?)
    }

    /// Files ascending by expiry, resuming after `after`.
    pub fn files_by_expiry(
        &self,
        after: Option<ExpiryCursor>,
        limit: usize,
    ) -> Result<Page<FileRecord, ExpiryCursor>> {
        let _guard = self.lock.read();
        query::files_by_expiry(&self.store, after, limit)
    }

    /// Endorsements of one file in key order, resuming after the key `after`.
    pub fn endorsements_of(
        &self,
        file_id: u64,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Page<EndorsementRecord, u64>> {
        let _guard = self.lock.read();
        query::endorsements_of(&self.store, file_id, after, limit)
    }

    /// Endorsements of all files in composite-key order.
    pub fn endorsements_by_key(
        &self,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Page<EndorsementRecord, u64>> {
        let _guard = self.lock.read();
        query::endorsements_by_key(&self.store, after, limit)
    }

    pub fn stats(&self) -> Result<LedgerStats> {
        let _guard = self.lock.read();
        query::stats(&self.store)
    }
}

fn log_failure(operation: &str, hash: &Digest256, err: &LedgerError) {
    if err.is_rejection() {
        warn!(operation, hash = %hash, reason = %err, "operation rejected");
    } else {
        warn!(operation, hash = %hash, error = %err, "operation failed in storage");
    }
}
