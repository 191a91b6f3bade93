//! Composite secondary keys scoped by owner.
//!
//! A composite key packs an owner id and a local entry id into one sortable
//! `u64`: `key = local + owner * 2^32`. Every entry of one owner lands in the
//! contiguous interval `[owner * 2^32, (owner + 1) * 2^32)`, ordered by its
//! local id. This gives "all endorsements of file X" as a bounded range scan
//! without a dedicated per-owner index, and lets an external reader resume a
//! paginated scan from the last key it saw even while other owners' entries
//! are inserted.
//!
//! Both halves must stay below 2^32. A value outside the bound is rejected
//! rather than truncated: an owner id that large does not fit, and a local id
//! that large would spill into the next owner's interval.

use std::ops::RangeInclusive;
use thiserror::Error;

/// Multiplier separating the owner half from the local half.
pub const OWNER_MULTIPLIER: u64 = 1 << 32;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKeyError {
    #[error("owner id {0} does not fit in 32 bits")]
    OwnerOutOfRange(u64),
    #[error("local id {0} does not fit in 32 bits")]
    LocalOutOfRange(u64),
}

/// Encode `(owner, local)` into a composite key.
pub fn encode(owner: u64, local: u64) -> Result<u64, CompositeKeyError> {
    if owner >= OWNER_MULTIPLIER {
        return Err(CompositeKeyError::OwnerOutOfRange(owner));
    }
    if local >= OWNER_MULTIPLIER {
        return Err(CompositeKeyError::LocalOutOfRange(local));
    }
    Ok(local + owner * OWNER_MULTIPLIER)
}

/// Key interval holding every entry of `owner`, inclusive on both ends so
/// the last owner's interval can end at `u64::MAX`.
pub fn range(owner: u64) -> Result<RangeInclusive<u64>, CompositeKeyError> {
    let start = encode(owner, 0)?;
    Ok(start..=start + (OWNER_MULTIPLIER - 1))
}

/// Owner half of a key.
pub fn owner_of(key: u64) -> u64 {
    key / OWNER_MULTIPLIER
}
