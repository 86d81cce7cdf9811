//! In-memory [`FileSystem`] for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use stylehint_core::path::resolve_path;
use stylehint_core::{Error, Result};

use super::{DirEntry, FileHandle, FileStat, FileSystem};

struct MemFile {
    text: String,
    modified: DateTime<Utc>,
}

/// Files keyed by absolute path. Directories exist implicitly.
#[derive(Default)]
pub(crate) struct MemoryFs {
    files: Mutex<BTreeMap<PathBuf, MemFile>>,
    reads: Mutex<HashMap<PathBuf, usize>>,
    read_delay: Mutex<Option<Duration>>,
}

impl MemoryFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file, stamping it with the current time.
    pub(crate) fn write(&self, path: impl Into<PathBuf>, text: &str) {
        self.files.lock().insert(path.into(), MemFile { text: text.to_string(), modified: Utc::now() });
    }

    /// Overwrite a file and move its mtime into the future.
    pub(crate) fn update(&self, path: impl Into<PathBuf>, text: &str) {
        let modified = Utc::now() + chrono::Duration::seconds(5);
        self.files.lock().insert(path.into(), MemFile { text: text.to_string(), modified });
    }

    pub(crate) fn remove(&self, path: &Path) {
        self.files.lock().remove(path);
    }

    /// Number of `read_text` calls made for `path`.
    pub(crate) fn read_count(&self, path: &Path) -> usize {
        self.reads.lock().get(path).copied().unwrap_or(0)
    }

    /// Make every `read_text` sleep first, so callers overlap.
    pub(crate) fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock() = Some(delay);
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn read_text(&self, file: &FileHandle) -> Result<String> {
        *self.reads.lock().entry(file.path.clone()).or_default() += 1;

        let delay = *self.read_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let files = self.files.lock();
        files.get(&file.path).map(|f| f.text.clone()).ok_or_else(|| Error::NotFound(file.path.clone()))
    }

    async fn stat(&self, file: &FileHandle) -> Result<FileStat> {
        let files = self.files.lock();
        files
            .get(&file.path)
            .map(|f| FileStat { modified: f.modified, len: f.text.len() as u64 })
            .ok_or_else(|| Error::NotFound(file.path.clone()))
    }

    /// Collapses `.` and `..` the way canonicalizing a real path would.
    async fn resolve(&self, path: &Path) -> Result<FileHandle> {
        let canonical = PathBuf::from(resolve_path(&path.to_string_lossy()));
        if self.files.lock().contains_key(&canonical) {
            Ok(FileHandle::new(canonical))
        } else {
            Err(Error::NotFound(path.to_path_buf()))
        }
    }

    async fn list_directory(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let files = self.files.lock();
        let mut seen_dirs = BTreeSet::new();
        let mut entries = Vec::new();

        for path in files.keys() {
            let Ok(rest) = path.strip_prefix(dir) else {
                continue;
            };
            let mut components = rest.components();
            let Some(first) = components.next() else {
                continue;
            };

            let name = first.as_os_str().to_string_lossy().into_owned();
            let child = dir.join(&name);
            if components.next().is_none() {
                entries.push(DirEntry { path: child, name, is_file: true, is_directory: false });
            } else if seen_dirs.insert(name.clone()) {
                entries.push(DirEntry { path: child, name, is_file: false, is_directory: true });
            }
        }

        if entries.is_empty() {
            return Err(Error::NotFound(dir.to_path_buf()));
        }
        Ok(entries)
    }
}
