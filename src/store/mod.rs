//! Feed stores
//!
//! A store persists exactly one [`CachedFeed`] record. Two implementations are
//! provided:
//!
//! - [`JsonFeedStore`]: the record encoded as JSON in a single file
//! - [`SqliteFeedStore`]: the record and its ordered items in SQLite
//!
//! # Ordering
//!
//! Every store runs its operations on one [`SerialQueue`]. Each method enqueues
//! its work *before* returning the future, so operations apply their side
//! effects and resolve in the order they were called, from any thread, whether
//! or not the returned futures are polled in that order.

mod json;
mod serial;
mod sqlite;

pub use json::JsonFeedStore;
pub use serial::SerialQueue;
pub use sqlite::{SqliteFeedStore, SqliteStorage, SCHEMA_VERSION};

#[cfg(any(test, feature = "testkit"))]
pub use sqlite::StoreFault;

use crate::cache::{CachedFeed, LocalFeedItem};
use crate::Result;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Pending result of a store operation
///
/// The operation is already queued when the future is handed out; dropping the
/// future discards the result, not the side effect.
pub type StoreFuture<T> = BoxFuture<'static, Result<T>>;

/// Single-slot persistence for the cached feed
///
/// Results may resolve on any thread; callers synchronise themselves.
pub trait FeedStore: Send + Sync {
    /// Read the cached feed. `Ok(None)` means nothing is cached.
    fn retrieve(&self) -> StoreFuture<Option<CachedFeed>>;

    /// Replace any cached feed with `feed`, cached at `timestamp`
    fn insert(&self, feed: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) -> StoreFuture<()>;

    /// Remove the cached feed. Succeeds when nothing is cached.
    fn delete_cached_feed(&self) -> StoreFuture<()>;
}

impl<S: FeedStore + ?Sized> FeedStore for Arc<S> {
    fn retrieve(&self) -> StoreFuture<Option<CachedFeed>> {
        (**self).retrieve()
    }

    fn insert(&self, feed: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) -> StoreFuture<()> {
        (**self).insert(feed, timestamp)
    }

    fn delete_cached_feed(&self) -> StoreFuture<()> {
        (**self).delete_cached_feed()
    }
}

impl<S: FeedStore + ?Sized> FeedStore for Box<S> {
    fn retrieve(&self) -> StoreFuture<Option<CachedFeed>> {
        (**self).retrieve()
    }

    fn insert(&self, feed: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) -> StoreFuture<()> {
        (**self).insert(feed, timestamp)
    }

    fn delete_cached_feed(&self) -> StoreFuture<()> {
        (**self).delete_cached_feed()
    }
}
