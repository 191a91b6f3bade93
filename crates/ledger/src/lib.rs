//! Attest content-attestation ledger.
//!
//! Accounts register the digest of a file (never the file itself), other
//! accounts endorse registered digests, and a sweeper evicts digests once
//! their one-year retention window has passed.
//!
//! ```text
//! register ──► registry ──┐
//! endorse  ──► endorsement├──► WriteBatch ──► LedgerStore::commit (atomic)
//! sweep    ──► sweeper ───┘
//! ```
//!
//! Each operation validates against the store first and produces a single
//! write batch; a refused operation leaves the store untouched.

pub mod endorsement;
pub mod error;
pub mod ledger;
pub mod query;
pub mod registry;
pub mod sweeper;

pub use endorsement::Endorsement;
pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use query::{LedgerStats, Page};
pub use registry::Registration;
pub use sweeper::SweepReport;

pub use attest_storage::{ExpiryCursor, LedgerStore, MemoryLedgerStore, SledLedgerStore};
pub use attest_types::{
    AccountId, Digest256, EndorsementRecord, FileRecord, Timestamp, MAX_ENDORSEMENTS_PER_FILE,
    RETENTION_SECS,
};
