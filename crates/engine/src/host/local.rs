//! [`FileSystem`] over the local disk.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stylehint_core::{Error, Result};

use super::{DirEntry, FileHandle, FileStat, FileSystem};

/// Local disk access through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for LocalFs {
    async fn read_text(&self, file: &FileHandle) -> Result<String> {
        tokio::fs::read_to_string(&file.path).await.map_err(|e| Error::from_io(&file.path, e))
    }

    async fn stat(&self, file: &FileHandle) -> Result<FileStat> {
        let metadata = tokio::fs::metadata(&file.path).await.map_err(|e| Error::from_io(&file.path, e))?;
        if !metadata.is_file() {
            return Err(Error::NotFound(file.path.clone()));
        }

        let modified = metadata.modified().map_err(|e| Error::from_io(&file.path, e))?;
        Ok(FileStat { modified: DateTime::<Utc>::from(modified), len: metadata.len() })
    }

    /// Canonicalize `path`, following symlinks, and require a regular file.
    async fn resolve(&self, path: &Path) -> Result<FileHandle> {
        let resolve_failed = |e| match Error::from_io(path, e) {
            Error::ReadFailed { path, reason } => Error::ResolveFailed { path, reason },
            other => other,
        };
        let canonical = tokio::fs::canonicalize(path).await.map_err(resolve_failed)?;
        let metadata = tokio::fs::metadata(&canonical).await.map_err(resolve_failed)?;

        if metadata.is_file() { Ok(FileHandle::new(canonical)) } else { Err(Error::NotFound(path.to_path_buf())) }
    }

    async fn list_directory(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let mut reader = tokio::fs::read_dir(dir).await.map_err(|e| Error::from_io(dir, e))?;
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry().await.map_err(|e| Error::from_io(dir, e))? {
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::debug!(path = %entry.path().display(), error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            entries.push(DirEntry {
                path: entry.path(),
                name: entry.file_name().to_string_lossy().into_owned(),
                is_file: file_type.is_file(),
                is_directory: file_type.is_dir(),
            });
        }

        Ok(entries)
    }
}
