//! Test fixtures

use crate::cache::{conversions, LocalFeedItem, DEFAULT_MAX_AGE_DAYS};
use crate::FeedCacheError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use feed::FeedItem;
use url::Url;
use uuid::Uuid;

/// Where a cache timestamp sits relative to the expiration boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAge {
    /// One second younger than the maximum age
    NotExpired,
    /// Exactly the maximum age
    AtExpiration,
    /// One second older than the maximum age
    Expired,
}

/// A fixed instant for deterministic clocks
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

/// Timestamp of a cache with the given age at `now`, for the default policy
pub fn cache_timestamp(now: DateTime<Utc>, age: CacheAge) -> DateTime<Utc> {
    let expiration = now - Duration::days(DEFAULT_MAX_AGE_DAYS);
    match age {
        CacheAge::NotExpired => expiration + Duration::seconds(1),
        CacheAge::AtExpiration => expiration,
        CacheAge::Expired => expiration - Duration::seconds(1),
    }
}

/// Three items with fresh ids
pub fn unique_feed() -> Vec<FeedItem> {
    (1..=3)
        .map(|i| {
            let url = Url::parse(&format!("https://an-image-url.com/?id={}", i))
                .expect("valid image url");
            FeedItem::new(Uuid::new_v4(), url)
                .with_description(format!("a description {}", i))
                .with_location(format!("a location {}", i))
        })
        .collect()
}

/// A unique feed together with its cache representation
pub fn unique_feed_with_local() -> (Vec<FeedItem>, Vec<LocalFeedItem>) {
    let feed = unique_feed();
    let local = conversions::to_local(&feed);
    (feed, local)
}

/// A unique cache-side feed and a timestamp that is not expired right now
pub fn non_expired_local_feed() -> (Vec<LocalFeedItem>, DateTime<Utc>) {
    let (_, local) = unique_feed_with_local();
    (local, cache_timestamp(Utc::now(), CacheAge::NotExpired))
}

pub fn any_error() -> FeedCacheError {
    FeedCacheError::Other("any error".to_string())
}
