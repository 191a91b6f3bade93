//! Error types for ledger storage backends

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt index entry: {0}")]
    Corrupt(String),

    #[error("Batch conflicts with stored state: {0}")]
    Conflict(String),

    #[error("Invalid composite key: {0}")]
    Key(#[from] attest_types::CompositeKeyError),
}

pub type Result<T> = std::result::Result<T, StorageError>;
