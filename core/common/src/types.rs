//! Common types used throughout gdshare.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the remote folder every operation is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderId(String);

impl FolderId {
    /// Create a new FolderId from a string.
    ///
    /// # Preconditions
    /// - `id` must be non-empty after trimming whitespace
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidInput(
                "FolderId cannot be empty".to_string(),
            ));
        }
        if trimmed.contains('\'') {
            return Err(crate::Error::InvalidInput(
                "FolderId cannot contain quotes".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for FolderId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<FolderId> for String {
    fn from(id: FolderId) -> Self {
        id.0
    }
}

/// Maximum age, in calendar days, a file may reach before it is purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_days: u32,
}

impl RetentionPolicy {
    /// Default retention limit.
    pub const DEFAULT_MAX_DAYS: u32 = 30;

    /// Create a policy keeping files for `max_days` days.
    ///
    /// # Errors
    /// - Returns error if `max_days` is zero
    pub fn new(max_days: u32) -> crate::Result<Self> {
        if max_days == 0 {
            return Err(crate::Error::InvalidInput(
                "Retention must be at least one day".to_string(),
            ));
        }
        Ok(Self { max_days })
    }

    pub fn max_days(&self) -> u32 {
        self.max_days
    }

    /// Calendar days between the UTC date of `created_at` and `today`.
    ///
    /// Negative when `created_at` lies after `today`.
    pub fn days_old(created_at: DateTime<Utc>, today: NaiveDate) -> i64 {
        (today - created_at.date_naive()).num_days()
    }

    /// Whether a file this many days old is due for deletion.
    ///
    /// The threshold is inclusive: a file exactly `max_days` old expires.
    pub fn is_expired(&self, days_old: i64) -> bool {
        days_old >= i64::from(self.max_days)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_days: Self::DEFAULT_MAX_DAYS,
        }
    }
}
