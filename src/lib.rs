//! feedcache - Local feed cache
//!
//! Persists a copy of a remotely fetched feed and serves it back while it is
//! younger than a maximum age (seven days by default). A cache exactly at the
//! maximum age is already expired.
//!
//! # Architecture
//!
//! - **cache**: [`LocalFeedLoader`](cache::LocalFeedLoader) coordinating save, load and
//!   validate, plus the expiration policy
//! - **store**: The [`FeedStore`](store::FeedStore) contract and its JSON file and SQLite
//!   implementations, each running operations serially in submission order
//! - **config**: YAML configuration selecting the store and the maximum age
//! - **logging**: tracing subscriber setup
//!
//! The feed model itself lives in the `feed` crate.

// Core modules
pub mod cache;
pub mod error;
pub mod store;

// Ambient
pub mod config;
pub mod logging;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

// Re-exports
pub use error::{FeedCacheError, Result};
