//! JSON file feed store
//!
//! Persists the cached feed as one JSON document:
//!
//! ```text
//! {
//!   "version": 1,
//!   "feed": [{"id": "...", "description": "...", "location": "...", "url": "..."}],
//!   "timestamp": "2024-03-10T12:00:00.123456789Z"
//! }
//! ```
//!
//! A missing file is an empty cache. Inserts write a temporary file next to the
//! target and rename it into place, so a failed insert never leaves a partial
//! document behind.

use super::serial::SerialQueue;
use super::{FeedStore, StoreFuture};
use crate::cache::{CachedFeed, LocalFeedItem};
use crate::{FeedCacheError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use url::Url;
use uuid::Uuid;

/// Current document version
const FORMAT_VERSION: u32 = 1;

/// Documents written before the version field existed are version 1
fn default_version() -> u32 {
    1
}

/// Versioned cache document
#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default = "default_version")]
    version: u32,
    feed: Vec<ItemRecord>,
    timestamp: DateTime<Utc>,
}

/// Encoded form of a cached item
#[derive(Debug, Serialize, Deserialize)]
struct ItemRecord {
    id: Uuid,
    description: Option<String>,
    location: Option<String>,
    url: Url,
}

impl From<LocalFeedItem> for ItemRecord {
    fn from(item: LocalFeedItem) -> Self {
        Self {
            id: item.id,
            description: item.description,
            location: item.location,
            url: item.url,
        }
    }
}

impl From<ItemRecord> for LocalFeedItem {
    fn from(record: ItemRecord) -> Self {
        LocalFeedItem::new(record.id, record.description, record.location, record.url)
    }
}

/// The file the worker thread owns
struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    fn retrieve(&self) -> Result<Option<CachedFeed>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let document: CacheDocument = serde_json::from_slice(&bytes).map_err(|e| {
            FeedCacheError::InvalidData(format!("{}: {}", self.path.display(), e))
        })?;

        if document.version > FORMAT_VERSION {
            tracing::warn!(version = document.version, "Cache written by a newer format");
            return Err(FeedCacheError::InvalidData(format!(
                "{}: unsupported cache version {}",
                self.path.display(),
                document.version
            )));
        }

        Ok(Some(CachedFeed::new(
            document.feed.into_iter().map(LocalFeedItem::from).collect(),
            document.timestamp,
        )))
    }

    fn insert(&self, feed: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) -> Result<()> {
        let directory = self.directory();
        fs::create_dir_all(directory)?;

        let document = CacheDocument {
            version: FORMAT_VERSION,
            feed: feed.into_iter().map(ItemRecord::from).collect(),
            timestamp,
        };

        let mut staged = NamedTempFile::new_in(directory)?;
        serde_json::to_writer(&mut staged, &document)?;
        staged.flush()?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }

    fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Feed store backed by a single JSON file
pub struct JsonFeedStore {
    path: PathBuf,
    queue: SerialQueue<CacheFile>,
}

impl JsonFeedStore {
    /// Create a store for the file at `path`. Nothing is touched on disk until
    /// the first operation runs.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let queue = SerialQueue::spawn(
            "feedcache-json",
            CacheFile { path: path.clone() },
        )?;

        tracing::info!(path = %path.display(), "Opened JSON feed store");
        Ok(Self { path, queue })
    }

    /// Location of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedStore for JsonFeedStore {
    fn retrieve(&self) -> StoreFuture<Option<CachedFeed>> {
        self.queue.submit(|file| {
            let cached = file.retrieve();
            tracing::debug!(
                found = matches!(cached, Ok(Some(_))),
                failed = cached.is_err(),
                "Retrieved JSON cache"
            );
            cached
        })
    }

    fn insert(&self, feed: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) -> StoreFuture<()> {
        self.queue.submit(move |file| {
            tracing::debug!(items = feed.len(), %timestamp, "Writing JSON cache");
            file.insert(feed, timestamp)
        })
    }

    fn delete_cached_feed(&self) -> StoreFuture<()> {
        self.queue.submit(|file| {
            tracing::debug!(path = %file.path.display(), "Deleting JSON cache");
            file.delete()
        })
    }
}
