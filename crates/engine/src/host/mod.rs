//! Host collaborators: file access and stylesheet parsing.
//!
//! The cache engine never touches the disk or a CSS parser directly. It goes
//! through [`FileSystem`] and [`StylesheetParser`] so an editor integration
//! can hand in its own document model, and tests can run against memory.

mod lightning;
mod local;
#[cfg(test)]
pub(crate) mod memory;

pub use lightning::LightningParser;
pub use local::LocalFs;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stylehint_core::{CssRule, Result};

/// A path that was confirmed to name an existing regular file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle {
    pub path: PathBuf,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// File metadata needed for staleness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub modified: DateTime<Utc>,
    pub len: u64,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_file: bool,
    pub is_directory: bool,
}

/// File access used by cache entries and the project scan.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read the whole file as UTF-8 text.
    async fn read_text(&self, file: &FileHandle) -> Result<String>;

    /// Stat the file. Fails with `Error::NotFound` once the file is gone.
    async fn stat(&self, file: &FileHandle) -> Result<FileStat>;

    /// Turn a path into a handle, failing with `Error::NotFound` when it does
    /// not name an existing regular file.
    async fn resolve(&self, path: &Path) -> Result<FileHandle>;

    /// List the direct children of a directory.
    async fn list_directory(&self, dir: &Path) -> Result<Vec<DirEntry>>;
}

/// Turns stylesheet text into a structured rule list.
///
/// Identifiers in the returned selector text may be lower-cased; the
/// selector index recovers the authored case from the raw text.
#[async_trait]
pub trait StylesheetParser: Send + Sync {
    async fn parse_stylesheet(&self, text: &str) -> Result<Vec<CssRule>>;
}
