//! Atomic write batches.

use attest_types::{EndorsementRecord, FileRecord, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position in the expiry ordering: `(expires_at, id)`.
///
/// Files sharing an expiry are ordered by id, which is their registration
/// order. A cursor returned from a scan resumes strictly after that file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ExpiryCursor {
    pub expires_at: Timestamp,
    pub id: u64,
}

impl ExpiryCursor {
    pub fn of(file: &FileRecord) -> Self {
        Self {
            expires_at: file.expires_at,
            id: file.id,
        }
    }

    /// Big-endian encoding so byte order matches `Ord`.
    pub fn to_key(self) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&self.expires_at.as_secs().to_be_bytes());
        key[8..].copy_from_slice(&self.id.to_be_bytes());
        key
    }

    pub fn from_key(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 16 {
            return None;
        }
        let expires: [u8; 8] = bytes[..8].try_into().ok()?;
        let id: [u8; 8] = bytes[8..].try_into().ok()?;
        Some(Self {
            expires_at: Timestamp(u64::from_be_bytes(expires)),
            id: u64::from_be_bytes(id),
        })
    }
}

/// Textual form `expires_at:id`, as printed by [`fmt::Display`].
impl fmt::Display for ExpiryCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.expires_at, self.id)
    }
}

impl FromStr for ExpiryCursor {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (expires, id) = value
            .split_once(':')
            .ok_or_else(|| format!("expected `expires:id`, got `{value}`"))?;
        let expires_at = expires
            .parse::<u64>()
            .map_err(|err| format!("invalid expiry `{expires}`: {err}"))?;
        let id = id
            .parse::<u64>()
            .map_err(|err| format!("invalid file id `{id}`: {err}"))?;
        Ok(Self {
            expires_at: Timestamp(expires_at),
            id,
        })
    }
}

/// One mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    PutFile(FileRecord),
    DeleteFile(FileRecord),
    PutEndorsement(EndorsementRecord),
    DeleteEndorsement(EndorsementRecord),
}

/// Ordered list of mutations applied all-or-nothing by
/// [`LedgerStore::commit`](crate::LedgerStore::commit).
///
/// Deletes carry the full record so every secondary index entry can be
/// removed without another lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_file(&mut self, file: FileRecord) -> &mut Self {
        self.ops.push(BatchOp::PutFile(file));
        self
    }

    pub fn delete_file(&mut self, file: FileRecord) -> &mut Self {
        self.ops.push(BatchOp::DeleteFile(file));
        self
    }

    pub fn put_endorsement(&mut self, endorsement: EndorsementRecord) -> &mut Self {
        self.ops.push(BatchOp::PutEndorsement(endorsement));
        self
    }

    pub fn delete_endorsement(&mut self, endorsement: EndorsementRecord) -> &mut Self {
        self.ops.push(BatchOp::DeleteEndorsement(endorsement));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_key_orders_like_cursor() {
        let a = ExpiryCursor {
            expires_at: Timestamp(10),
            id: 500,
        };
        let b = ExpiryCursor {
            expires_at: Timestamp(11),
            id: 1,
        };
        let c = ExpiryCursor {
            expires_at: Timestamp(11),
            id: 2,
        };
        assert!(a < b && b < c);
        assert!(a.to_key() < b.to_key() && b.to_key() < c.to_key());
        assert_eq!(ExpiryCursor::from_key(&c.to_key()), Some(c));
        assert_eq!(ExpiryCursor::from_key(&[0u8; 15]), None);
    }

    #[test]
    fn cursor_text_form() {
        let cursor: ExpiryCursor = "1700000000:42".parse().unwrap();
        assert_eq!(cursor.expires_at, Timestamp(1_700_000_000));
        assert_eq!(cursor.id, 42);
        assert_eq!(cursor.to_string(), "1700000000:42");
        assert!("1700000000".parse::<ExpiryCursor>().is_err());
        assert!("x:1".parse::<ExpiryCursor>().is_err());
    }
}
