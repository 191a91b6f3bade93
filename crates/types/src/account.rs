use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing an account identifier string.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AccountIdError {
    #[error("account id must be {expected} characters (or {bare} without prefix), got {actual}")]
    InvalidLength {
        expected: usize,
        bare: usize,
        actual: usize,
    },
    #[error("account id payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Number of raw bytes contained in an account identifier.
pub const ACCOUNT_ID_BYTES: usize = 32;
/// Expected string length of an encoded account id (prefix + 64 hex chars).
pub const ACCOUNT_ID_STRING_LENGTH: usize = 1 + ACCOUNT_ID_BYTES * 2;

/// Identifier of an already-authenticated account.
///
/// The ledger never checks keys or signatures; whoever submits an operation
/// vouches that the caller controls this account. The human readable form is
/// the character `i` followed by the lowercase hex of the raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(pub [u8; ACCOUNT_ID_BYTES]);

impl AccountId {
    /// Render in the `i`-prefixed text form.
    pub fn encode(&self) -> String {
        let mut encoded = String::with_capacity(ACCOUNT_ID_STRING_LENGTH);
        encoded.push('i');
        encoded.push_str(&hex::encode(self.0));
        encoded
    }

    /// Parse either the `i`-prefixed form or a bare 64 character hex string.
    pub fn decode(value: &str) -> Result<Self, AccountIdError> {
        let payload = match value.len() {
            ACCOUNT_ID_STRING_LENGTH if value.starts_with('i') => &value[1..],
            len if len == ACCOUNT_ID_BYTES * 2 => value,
            actual => {
                return Err(AccountIdError::InvalidLength {
                    expected: ACCOUNT_ID_STRING_LENGTH,
                    bare: ACCOUNT_ID_BYTES * 2,
                    actual,
                })
            }
        };

        let mut bytes = [0u8; ACCOUNT_ID_BYTES];
        hex::decode_to_slice(payload, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.encode())
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl From<[u8; ACCOUNT_ID_BYTES]> for AccountId {
    fn from(value: [u8; ACCOUNT_ID_BYTES]) -> Self {
        AccountId(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.encode()
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::decode(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let account = AccountId([0xABu8; ACCOUNT_ID_BYTES]);
        let encoded = account.encode();
        assert!(encoded.starts_with('i'));
        assert_eq!(encoded.len(), ACCOUNT_ID_STRING_LENGTH);
        assert_eq!(AccountId::decode(&encoded).unwrap(), account);
    }

    #[test]
    fn bare_hex_accepted() {
        let bare = "01".repeat(ACCOUNT_ID_BYTES);
        let account: AccountId = bare.parse().unwrap();
        assert_eq!(account, AccountId([1u8; ACCOUNT_ID_BYTES]));
    }

    #[test]
    fn invalid_length_rejected() {
        let bad = "i".to_string() + &"00".repeat(ACCOUNT_ID_BYTES - 1);
        let err = AccountId::decode(&bad).unwrap_err();
        assert!(matches!(err, AccountIdError::InvalidLength { .. }));
    }

    #[test]
    fn invalid_hex_rejected() {
        let bad = format!("i{}", "gg".repeat(ACCOUNT_ID_BYTES));
        let err = AccountId::decode(&bad).unwrap_err();
        assert!(matches!(err, AccountIdError::InvalidHex(_)));
    }

    #[test]
    fn parse_errors_compare_by_value() {
        let bad = format!("i{}", "gg".repeat(ACCOUNT_ID_BYTES));
        assert_eq!(
            AccountId::decode(&bad),
            Err(AccountIdError::InvalidHex(
                hex::FromHexError::InvalidHexCharacter { c: 'g', index: 0 }
            ))
        );
        assert_eq!(
            AccountId::decode("i00"),
            Err(AccountIdError::InvalidLength {
                expected: ACCOUNT_ID_STRING_LENGTH,
                bare: ACCOUNT_ID_BYTES * 2,
                actual: 3,
            })
        );
    }

    #[test]
    fn serializes_as_string() {
        let account = AccountId([7u8; ACCOUNT_ID_BYTES]);
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, format!("\"{}\"", account.encode()));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
    }
}
