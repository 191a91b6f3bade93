//! Attest core data model.
//!
//! Account and digest identifiers, the two ledger record types, and the
//! composite key codec used to scope endorsements by file.

pub mod account;
pub mod composite_key;
pub mod digest;
pub mod records;
pub mod timestamp;

pub use account::*;
pub use composite_key::CompositeKeyError;
pub use digest::*;
pub use records::*;
pub use timestamp::*;
