//! Retention window selection.
//!
//! Pure part of the purge: decides which entries are expired. Deletion is
//! done by the engine against the store.

use crate::errors::{ExError, ExErrorKind, Result};
use chrono::{DateTime, Duration, Utc};

/// A single retention window applied per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    older_than: Duration,
}

impl RetentionPolicy {
    /// # Errors
    ///
    /// `Config` if the window is not positive.
    pub fn new(older_than: Duration) -> Result<Self> {
        if older_than <= Duration::zero() {
            return Err(ExError::new(ExErrorKind::Config)
                .with_op("retention_policy")
                .with_message(format!(
                    "retention window must be positive, got {}s",
                    older_than.num_seconds()
                )));
        }
        Ok(Self { older_than })
    }

    /// # Errors
    ///
    /// `Config` if `hours` is zero or overflows.
    pub fn from_hours(hours: u64) -> Result<Self> {
        let hours = i64::try_from(hours).map_err(|_| {
            ExError::new(ExErrorKind::Config)
                .with_op("retention_policy")
                .with_message(format!("retention window of {} hours is too large", hours))
        })?;
        let window = Duration::try_hours(hours).ok_or_else(|| {
            ExError::new(ExErrorKind::Config)
                .with_op("retention_policy")
                .with_message(format!("retention window of {} hours is too large", hours))
        })?;
        Self::new(window)
    }

    pub fn older_than(&self) -> Duration {
        self.older_than
    }

    /// Expired when `now - created_at >= older_than`.
    pub fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(created_at) >= self.older_than
    }
}

/// Entries whose timestamp falls outside the window, in input order.
pub fn select_expired<'a, T, F>(
    entries: &'a [T],
    created_at: F,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Vec<&'a T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    entries
        .iter()
        .filter(|entry| policy.is_expired(created_at(entry), now))
        .collect()
}
