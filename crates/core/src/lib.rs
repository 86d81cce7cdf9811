//! Core types for stylehint.
//!
//! This crate provides:
//! - The tag-scoped selector index and selector tokenizing
//! - Path resolution for stylesheet links
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod index;
pub mod path;
pub mod rules;

pub use config::{CacheConfig, ConfigError};
pub use error::Error;
pub use index::{ANY_TAG, SelectorIndex};
pub use rules::{CssRule, StyleRule};

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;
