//! Error types for feedcache
//!
//! One error enum covers every failure the cache can report: store I/O, undecodable
//! stored data, configuration, and the serial worker going away.
//! Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Result type alias for feedcache operations
pub type Result<T> = std::result::Result<T, FeedCacheError>;

/// Error type for feedcache operations
#[derive(Error, Debug)]
pub enum FeedCacheError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored data exists but cannot be decoded
    #[error("Invalid cache data: {0}")]
    InvalidData(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// SQLite database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store's serial worker stopped before answering
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The loader was dropped while an operation was in flight
    #[error("Feed loader released before the operation completed")]
    LoaderReleased,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl FeedCacheError {
    /// Whether this error means the stored record is unreadable, as opposed to
    /// the medium refusing the operation
    pub fn is_invalid_data(&self) -> bool {
        matches!(self, FeedCacheError::InvalidData(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: FeedCacheError = io.into();
        assert!(matches!(err, FeedCacheError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: denied");
    }

    #[test]
    fn test_invalid_data_classification() {
        assert!(FeedCacheError::InvalidData("bad".into()).is_invalid_data());
        assert!(!FeedCacheError::Other("bad".into()).is_invalid_data());
    }

    #[test]
    fn test_errors_cross_threads() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<FeedCacheError>();
    }
}
