//! Normalized identity of a direct (two-member) conversation.

use std::fmt;

use memberhub_core::AppError;
use memberhub_core::types::UserId;
use serde::{Deserialize, Serialize};

/// Unordered pair of distinct members, stored in sorted order.
///
/// `DirectKey::new(a, b) == DirectKey::new(b, a)`; stores put a unique
/// constraint on its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectKey {
    low: UserId,
    high: UserId,
}

impl DirectKey {
    /// Build the key for a pair. A member cannot converse with themself.
    pub fn new(a: UserId, b: UserId) -> Result<Self, AppError> {
        if a == b {
            return Err(AppError::validation(
                "A direct conversation needs two distinct members",
            ));
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    /// Both members, lower id first.
    pub fn members(&self) -> [UserId; 2] {
        [self.low, self.high]
    }

    /// Whether `user` is one of the pair.
    pub fn contains(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }
}

impl fmt::Display for DirectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}
