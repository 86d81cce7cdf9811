//! Host events and per-entry listeners.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use indexmap::IndexSet;
use tokio::sync::broadcast::{self, error::RecvError};

use super::registry::log_fetch_failure;
use super::CacheManager;
use crate::cache::{CacheEvent, HtmlCache};
use crate::host::{DirEntry, FileHandle};

/// The editor that just became active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEditor {
    pub path: PathBuf,
    /// Language mode of the editor, such as `html` or `css`.
    pub language: String,
}

impl ActiveEditor {
    pub fn new(path: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self { path: path.into(), language: language.into() }
    }

    pub fn is_html(&self) -> bool {
        self.language.eq_ignore_ascii_case("html")
    }
}

/// A file system change reported by the host watcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsChange {
    /// The entry the watcher reported as changed.
    pub changed: PathBuf,
    /// Only directory-level changes carry `added` and `removed` lists.
    pub is_directory: bool,
    pub added: Vec<DirEntry>,
    pub removed: Vec<DirEntry>,
}

impl CacheManager {
    /// Build or refresh the HTML entry when an HTML editor becomes active.
    pub async fn on_editor_change(&self, editor: Option<&ActiveEditor>) -> Option<Arc<HtmlCache>> {
        let editor = editor.filter(|editor| editor.is_html())?;
        self.create_html_cache(editor.path.as_path()).await
    }

    /// Refetch the entry for a saved document. Returns whether one existed.
    pub async fn on_document_saved(&self, path: &Path) -> bool {
        let Some(entry) = self.entry(path) else {
            return false;
        };

        if let Err(e) = entry.fetch().await {
            log_fetch_failure(path, &e);
        }
        true
    }

    /// Same as [`CacheManager::on_document_saved`]; the host reloaded the document from disk.
    pub async fn on_document_refreshed(&self, path: &Path) -> bool {
        self.on_document_saved(path).await
    }

    /// Track stylesheets added to or removed from a directory.
    pub async fn on_file_system_change(&self, change: &FsChange) {
        if !change.is_directory {
            return;
        }

        let config = self.config();
        let is_stylesheet = |entry: &&DirEntry| entry.is_file && config.is_stylesheet(&entry.path);

        let added = change.added.iter().filter(is_stylesheet).map(|entry| {
            tracing::info!(path = %entry.path.display(), "new stylesheet detected");
            self.create_css_cache(FileHandle::new(&entry.path))
        });
        join_all(added).await;

        for entry in change.removed.iter().filter(is_stylesheet) {
            if self.remove_cache(&entry.path) {
                tracing::info!(path = %entry.path.display(), "stylesheet removed");
            }
        }
    }

    /// Follow an entry's events until it is disposed.
    pub(super) fn watch(&self, path: PathBuf, id: u64, mut events: broadcast::Receiver<CacheEvent>) {
        let manager = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(CacheEvent::FetchComplete { dependencies, .. }) => {
                        let Some(inner) = manager.upgrade() else {
                            break;
                        };
                        CacheManager { inner }.attach_dependencies(&dependencies).await;
                    }
                    Ok(CacheEvent::Disposed { .. }) => {
                        if let Some(inner) = manager.upgrade() {
                            CacheManager { inner }.unregister(&path, id);
                        }
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(path = %path.display(), skipped, "cache listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Create or refresh a CSS entry for each linked stylesheet.
    async fn attach_dependencies(&self, dependencies: &[PathBuf]) {
        let unique: IndexSet<&PathBuf> = dependencies.iter().collect();
        let requested = unique.len();

        let created = join_all(unique.into_iter().map(|path| self.create_css_cache(path.as_path()))).await;
        let attached = created.iter().flatten().count();

        tracing::debug!(requested, attached, "attached stylesheet dependencies");
    }
}
