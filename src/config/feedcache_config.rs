//! feedcache configuration file handling
//!
//! Loads and manages the ~/.config/feedcache/config.yaml file.

use super::validation::validate_config_result;
use crate::cache::{FeedCachePolicy, LocalFeedLoader, DEFAULT_MAX_AGE_DAYS};
use crate::store::{FeedStore, JsonFeedStore, SqliteFeedStore, SqliteStorage};
use crate::{FeedCacheError, Result};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which store implementation persists the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON document on disk
    Json,
    /// SQLite database
    #[default]
    Sqlite,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Json => write!(f, "json"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Cache file location
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Use write-ahead logging for SQLite databases
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

fn default_store_path() -> PathBuf {
    let mut path = config_dir();
    path.push("feed.db");
    path
}

fn default_wal_mode() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

/// Expiration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Age in days at which a cached feed stops being served
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,
}

fn default_max_age_days() -> i64 {
    DEFAULT_MAX_AGE_DAYS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
        }
    }
}

/// feedcache configuration
///
/// Represents the complete ~/.config/feedcache/config.yaml file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedCacheConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// ~/.config/feedcache
fn config_dir() -> PathBuf {
    // Always use ~/.config for consistency across platforms (macOS, Linux)
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("feedcache");
    path
}

impl FeedCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the default path (~/.config/feedcache/config.yaml)
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FeedCacheError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading feedcache configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            backend = %config.store.backend,
            store = %config.store.path.display(),
            max_age_days = config.cache.max_age_days,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving feedcache configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/feedcache/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = config_dir();
        path.push("config.yaml");
        path
    }

    /// Check the configuration, reporting every problem at once
    pub fn validate(&self) -> Result<()> {
        validate_config_result(self)
    }

    /// Expiration policy for the configured maximum age
    pub fn policy(&self) -> Result<FeedCachePolicy> {
        match Duration::try_days(self.cache.max_age_days) {
            Some(max_age) if self.cache.max_age_days > 0 => Ok(FeedCachePolicy::new(max_age)),
            _ => Err(FeedCacheError::Config(format!(
                "Invalid cache.max_age_days: {}",
                self.cache.max_age_days
            ))),
        }
    }

    /// Open the configured store
    pub fn open_store(&self) -> Result<Arc<dyn FeedStore>> {
        self.validate()?;

        let store: Arc<dyn FeedStore> = match self.store.backend {
            StoreBackend::Json => Arc::new(JsonFeedStore::new(&self.store.path)?),
            StoreBackend::Sqlite => Arc::new(SqliteFeedStore::with_wal_mode(
                SqliteStorage::Persistent(self.store.path.clone()),
                self.store.wal_mode,
            )?),
        };
        Ok(store)
    }

    /// Loader over the configured store, reading the system clock
    pub fn loader(&self) -> Result<LocalFeedLoader> {
        let policy = self.policy()?;
        Ok(LocalFeedLoader::with_policy(self.open_store()?, Utc::now, policy))
    }
}
