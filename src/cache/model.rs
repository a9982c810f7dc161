//! Cache-side representation of the feed
//!
//! These types only live inside the persistence boundary. They mirror
//! [`feed::FeedItem`] today, but stores encode these, never the feed model,
//! so the two can evolve independently.

use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

/// A feed item as the cache stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFeedItem {
    pub id: Uuid,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Url,
}

impl LocalFeedItem {
    pub fn new(
        id: Uuid,
        description: Option<String>,
        location: Option<String>,
        url: Url,
    ) -> Self {
        Self {
            id,
            description,
            location,
            url,
        }
    }
}

/// The single record a store holds: the feed plus when it was cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFeed {
    pub feed: Vec<LocalFeedItem>,
    pub timestamp: DateTime<Utc>,
}

impl CachedFeed {
    pub fn new(feed: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) -> Self {
        Self { feed, timestamp }
    }

    pub fn len(&self) -> usize {
        self.feed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feed.is_empty()
    }
}
