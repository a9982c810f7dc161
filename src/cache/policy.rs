//! Cache expiration policy
//!
//! A cached feed is usable while it is younger than the maximum age. A cache
//! whose age is exactly the maximum age is already expired.

use chrono::{DateTime, Duration, Utc};

/// Default maximum cache age in days
pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// Result of checking a cache timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Expired,
    NotExpired,
}

impl CacheStatus {
    pub fn is_expired(self) -> bool {
        self == CacheStatus::Expired
    }
}

/// Expiration policy for the feed cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCachePolicy {
    max_age: Duration,
}

impl FeedCachePolicy {
    /// Policy with a custom maximum age
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// Policy with a maximum age expressed in whole days
    pub fn with_max_age_days(days: i64) -> Self {
        Self::new(Duration::days(days))
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Classify a cache timestamp against the current time
    pub fn validate(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> CacheStatus {
        // Nothing can be older than the earliest representable instant
        let Some(expiration) = now.checked_sub_signed(self.max_age) else {
            return CacheStatus::NotExpired;
        };

        if timestamp <= expiration {
            CacheStatus::Expired
        } else {
            CacheStatus::NotExpired
        }
    }

    /// Age of a cache at `now`; negative when the timestamp is in the future
    pub fn age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        now - timestamp
    }
}

impl Default for FeedCachePolicy {
    fn default() -> Self {
        Self::with_max_age_days(DEFAULT_MAX_AGE_DAYS)
    }
}
