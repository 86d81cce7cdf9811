//! Cache configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STYLEHINT_*)
//! 2. TOML config file (if STYLEHINT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Configuration for the selector cache.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STYLEHINT_*)
/// 2. TOML config file (if STYLEHINT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Period of the stylesheet update check in milliseconds.
    ///
    /// Set via STYLEHINT_CHECK_INTERVAL_MS environment variable.
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// File extensions treated as stylesheets, without the leading dot.
    ///
    /// Set via STYLEHINT_STYLESHEET_EXTENSIONS environment variable.
    #[serde(default = "default_stylesheet_extensions")]
    pub stylesheet_extensions: Vec<String>,

    /// Files larger than this are not indexed.
    ///
    /// Set via STYLEHINT_MAX_FILE_BYTES environment variable.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Directory names skipped while scanning a project.
    ///
    /// Set via STYLEHINT_EXCLUDE_DIRS environment variable.
    #[serde(default)]
    pub exclude_dirs: Vec<String>,

    /// Project root used for root-relative stylesheet links before a project is opened.
    ///
    /// Set via STYLEHINT_PROJECT_ROOT environment variable.
    #[serde(default)]
    pub project_root: Option<PathBuf>,
}

fn default_check_interval_ms() -> u64 {
    20_000
}

fn default_stylesheet_extensions() -> Vec<String> {
    vec!["css".into()]
}

fn default_max_file_bytes() -> u64 {
    5_242_880 // 5MB
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval_ms(),
            stylesheet_extensions: default_stylesheet_extensions(),
            max_file_bytes: default_max_file_bytes(),
            exclude_dirs: Vec::new(),
            project_root: None,
        }
    }
}

impl CacheConfig {
    /// Check interval as Duration for use with tokio timers.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Whether `path` has one of the configured stylesheet extensions.
    pub fn is_stylesheet(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.stylesheet_extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
    }

    /// Whether a directory with this name is skipped by the project scan.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|dir| dir == name)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STYLEHINT_`
    /// 2. TOML file from `STYLEHINT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STYLEHINT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STYLEHINT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
