//! Configuration validation
//!
//! Validates feedcache configuration for correctness:
//! - The store has a usable path
//! - The maximum cache age is a positive, representable number of days

use super::feedcache_config::FeedCacheConfig;
use crate::FeedCacheError;
use chrono::Duration;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub section: Option<String>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            section: None,
            field: field.into(),
            message: message.into(),
        }
    }

    fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref section) = self.section {
            write!(f, "[{}] {}: {}", section, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a feedcache configuration
pub fn validate_config(config: &FeedCacheConfig) -> ValidationResult {
    let mut errors = Vec::new();

    let path = &config.store.path;
    if path.as_os_str().is_empty() {
        errors.push(ValidationError::new("path", "Store path cannot be empty").in_section("store"));
    } else if path.is_dir() {
        errors.push(
            ValidationError::new(
                "path",
                format!("Store path is a directory: {}", path.display()),
            )
            .in_section("store"),
        );
    }

    let days = config.cache.max_age_days;
    if days <= 0 {
        errors.push(
            ValidationError::new(
                "max_age_days",
                format!("Maximum age must be at least one day, got {}", days),
            )
            .in_section("cache"),
        );
    } else if Duration::try_days(days).is_none() {
        errors.push(
            ValidationError::new("max_age_days", format!("Maximum age is too large: {}", days))
                .in_section("cache"),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and convert errors to a feedcache Result
pub fn validate_config_result(config: &FeedCacheConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        FeedCacheError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_valid_config() {
        let result = validate_config(&FeedCacheConfig::new());
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_store_path() {
        let mut config = FeedCacheConfig::new();
        config.store.path = PathBuf::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "path");
        assert_eq!(errors[0].section.as_deref(), Some("store"));
    }

    #[test]
    fn test_store_path_is_directory() {
        let dir = TempDir::new().unwrap();
        let mut config = FeedCacheConfig::new();
        config.store.path = dir.path().to_path_buf();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].message.contains("directory"));
    }

    #[test]
    fn test_non_positive_max_age() {
        let mut config = FeedCacheConfig::new();
        config.cache.max_age_days = 0;
        assert!(validate_config(&config).is_err());

        config.cache.max_age_days = -3;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "max_age_days");
    }

    #[test]
    fn test_oversized_max_age() {
        let mut config = FeedCacheConfig::new();
        config.cache.max_age_days = i64::MAX;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = FeedCacheConfig::new();
        config.store.path = PathBuf::new();
        config.cache.max_age_days = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_error_display() {
        let error = ValidationError::new("max_age_days", "too small").in_section("cache");
        assert_eq!(error.to_string(), "[cache] max_age_days: too small");
    }

    #[test]
    fn test_validate_config_result() {
        let mut config = FeedCacheConfig::new();
        config.cache.max_age_days = 0;

        let err = validate_config_result(&config).unwrap_err();
        assert!(err.to_string().contains("[cache] max_age_days"));
    }
}
