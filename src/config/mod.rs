//! Configuration system
//!
//! Loads ~/.config/feedcache/config.yaml with support for:
//! - Choosing the store backend (JSON file or SQLite) and its location
//! - SQLite journal mode
//! - The maximum age of a cached feed

mod feedcache_config;
pub mod validation;

pub use feedcache_config::{CacheConfig, FeedCacheConfig, StoreBackend, StoreConfig};
pub use validation::{validate_config, validate_config_result, ValidationError};
