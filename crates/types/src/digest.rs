//! Fixed-size 256-bit digests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors emitted when decoding a digest from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("digest must be 64 hex characters, got {0}")]
    InvalidLength(usize),
    #[error("digest must be valid hex: {0}")]
    InvalidHex(String),
}

/// 256-bit digest.
///
/// Used for file content hashes (computed by the submitter, never by the
/// ledger) and for submission references that identify the operation a
/// record was created by.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest256(pub [u8; 32]);

impl Digest256 {
    /// Borrow the raw byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// BLAKE3 digest of `data`.
    pub fn blake3(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Render as lowercase hexadecimal.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64 character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, DigestError> {
        if hex_str.len() != 64 {
            return Err(DigestError::InvalidLength(hex_str.len()));
        }
        let mut arr = [0u8; 32];
        hex::decode_to_slice(hex_str, &mut arr)
            .map_err(|e| DigestError::InvalidHex(e.to_string()))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest256({})", self.to_hex())
    }
}

impl fmt::Display for Digest256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Digest256 {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<Digest256> for String {
    fn from(value: Digest256) -> Self {
        value.to_hex()
    }
}

impl TryFrom<String> for Digest256 {
    type Error = DigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}
