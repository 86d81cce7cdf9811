//! Unified error types for stylehint.
//!
//! Every variant renders with a stable code prefix so hosts can match on
//! the message without depending on the enum layout.

use std::path::PathBuf;

/// Unified error type shared by the index and the cache engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file does not exist (or is not a regular file).
    #[error("NOT_FOUND: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading the file failed for a reason other than absence.
    #[error("READ_FAILED: {}: {reason}", path.display())]
    ReadFailed { path: PathBuf, reason: String },

    /// The path could not be resolved to a file handle.
    #[error("RESOLVE_FAILED: {}: {reason}", path.display())]
    ResolveFailed { path: PathBuf, reason: String },

    /// The stylesheet parser rejected the text.
    #[error("PARSE_FAILED: {0}")]
    ParseFailed(String),

    /// The file exceeds the configured size limit.
    #[error("TOO_LARGE: {} ({size} bytes exceeds {limit})", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    /// The path is already registered as a different kind of cache.
    #[error("KIND_MISMATCH: {} is registered as {registered}", path.display())]
    KindMismatch { path: PathBuf, registered: &'static str },

    /// The cache entry has been disposed.
    #[error("DISPOSED")]
    Disposed,
}

impl Error {
    /// Build a read error from an I/O failure, mapping absence to `NotFound`.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path),
            _ => Error::ReadFailed { path, reason: err.to_string() },
        }
    }

    /// Whether this error means the backing file no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
