//! Range and shape checks for `CacheConfig`.
//!
//! Runs once every provider has been merged, so a bad environment variable
//! and a bad TOML value are reported the same way.

use crate::config::CacheConfig;
use thiserror::Error;

/// Errors raised while loading or checking a `CacheConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config load failed: {0}")]
    LoadFailed(String),

    #[error("invalid config field {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl CacheConfig {
    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `check_interval_ms` is below 500ms or exceeds one hour
    /// - `stylesheet_extensions` is empty or holds an empty/dotted extension
    /// - `max_file_bytes` is 0 or exceeds 50MB
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval_ms < 500 {
            return Err(ConfigError::Invalid {
                field: "check_interval_ms".into(),
                reason: "must be at least 500ms".into(),
            });
        }
        if self.check_interval_ms > 3_600_000 {
            return Err(ConfigError::Invalid {
                field: "check_interval_ms".into(),
                reason: "must not exceed one hour (3600000ms)".into(),
            });
        }

        if self.stylesheet_extensions.is_empty() {
            return Err(ConfigError::Invalid {
                field: "stylesheet_extensions".into(),
                reason: "must list at least one extension".into(),
            });
        }
        if let Some(bad) = self.stylesheet_extensions.iter().find(|ext| ext.is_empty() || ext.starts_with('.')) {
            return Err(ConfigError::Invalid {
                field: "stylesheet_extensions".into(),
                reason: format!("invalid extension {bad:?} (omit the leading dot)"),
            });
        }

        if self.max_file_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_file_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_file_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_file_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if let Some(root) = &self.project_root
            && !root.is_absolute()
        {
            tracing::warn!(
                project_root = %root.display(),
                "project_root is relative; root-relative links will resolve against it as given"
            );
        }

        Ok(())
    }
}
