//! Feed cache coordination
//!
//! [`LocalFeedLoader`] saves, loads and validates the cached feed through a
//! [`FeedStore`](crate::store::FeedStore), using [`FeedCachePolicy`] to decide
//! when the cached copy is too old to serve.

pub mod conversions;
mod loader;
mod model;
mod policy;

pub use loader::{DeletionReason, LocalFeedLoader, ValidationOutcome};
pub use model::{CachedFeed, LocalFeedItem};
pub use policy::{CacheStatus, FeedCachePolicy, DEFAULT_MAX_AGE_DAYS};
