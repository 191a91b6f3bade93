//! Error types for ledger operations

use attest_storage::StorageError;
use attest_types::{AccountId, CompositeKeyError, Digest256};
use thiserror::Error;

/// Every variant except [`LedgerError::Storage`] is a rule rejection: the
/// operation was refused before anything was written.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("This hash is already registered: {hash}")]
    DuplicateHash { hash: Digest256 },

    #[error("Cannot find this file hash: {hash}")]
    NotFound { hash: Digest256 },

    #[error("Author {account} of file {hash} cannot endorse it")]
    SelfEndorsement { account: AccountId, hash: Digest256 },

    #[error("Signer {signer} has already endorsed {hash}")]
    DuplicateEndorsement { signer: AccountId, hash: Digest256 },

    #[error("Too many endorsements for {hash} (max {max})")]
    QuotaExceeded { hash: Digest256, max: usize },

    #[error("Id space exhausted: {0}")]
    Capacity(String),

    #[error("There are no expired entries")]
    NothingToDo,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl LedgerError {
    /// True for refusals caused by the request or ledger state rather than
    /// by a storage fault.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}

impl From<CompositeKeyError> for LedgerError {
    fn from(err: CompositeKeyError) -> Self {
        LedgerError::Capacity(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
