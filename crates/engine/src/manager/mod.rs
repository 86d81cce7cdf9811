//! The registry of live cache entries.
//!
//! ### Registry
//! - One slot per path; a slot holds either an HTML or a CSS entry, never
//!   both, so a path can't be registered twice under different kinds.
//! - Construction is single-flight: concurrent requests for a path wait on
//!   the same slot and receive the same entry.
//! - Each entry gets a listener task that unregisters it on disposal and,
//!   for HTML entries, creates CSS entries for the stylesheets it links.
//!
//! ### Search
//! - A document with a known dependency list is searched together with the
//!   stylesheets it links; otherwise every registered stylesheet is searched.
//!
//! ### Invalidation
//! - Editor, save and file system events arrive through the `on_*` methods.
//! - [`CacheManager::spawn_update_checker`] polls stylesheets for changes.

mod events;
mod registry;
mod scan;
mod search;

pub use events::{ActiveEditor, FsChange};
pub use registry::FileRef;
pub use search::ClassCandidates;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use stylehint_core::CacheConfig;

use crate::cache::{CacheContext, CssCache, HtmlCache, StyleCache};
use crate::host::{FileSystem, LightningParser, LocalFs, StylesheetParser};
use registry::Slot;

struct Inner {
    config: CacheConfig,
    context: Arc<CacheContext>,
    slots: RwLock<IndexMap<PathBuf, Slot>>,
}

/// Process-wide registry of HTML and CSS cache entries.
///
/// Cloning is cheap and every clone shares the same registry.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

impl CacheManager {
    pub fn new(config: CacheConfig, fs: Arc<dyn FileSystem>, parser: Arc<dyn StylesheetParser>) -> Self {
        let context = Arc::new(CacheContext::new(fs, parser, &config));
        Self { inner: Arc::new(Inner { config, context, slots: RwLock::new(IndexMap::new()) }) }
    }

    /// A manager over the local disk with the lightningcss parser.
    pub fn with_local_fs(config: CacheConfig) -> Self {
        Self::new(config, Arc::new(LocalFs::new()), Arc::new(LightningParser::new()))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Root of the open project, if any.
    pub fn project_root(&self) -> Option<PathBuf> {
        self.inner.context.project_root()
    }

    /// Get or build the HTML entry for `file`.
    ///
    /// Every fetch of a new entry creates CSS entries for the stylesheets
    /// the document links. Returns `None` when the file can't be resolved or
    /// the path is registered as a stylesheet.
    pub async fn create_html_cache(&self, file: impl Into<FileRef>) -> Option<Arc<HtmlCache>> {
        self.get_or_create::<HtmlCache>(file.into()).await
    }

    /// Get or build the CSS entry for `file`.
    pub async fn create_css_cache(&self, file: impl Into<FileRef>) -> Option<Arc<CssCache>> {
        self.get_or_create::<CssCache>(file.into()).await
    }

    pub fn html_cache(&self, path: &Path) -> Option<Arc<HtmlCache>> {
        self.lookup::<HtmlCache>(path)
    }

    pub fn css_cache(&self, path: &Path) -> Option<Arc<CssCache>> {
        self.lookup::<CssCache>(path)
    }

    /// Paths of every built CSS entry in registration order.
    pub fn css_paths(&self) -> Vec<PathBuf> {
        self.css_entries().iter().map(|entry| entry.path().to_path_buf()).collect()
    }

    /// Whether a built entry of either kind exists for `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.entry(path).is_some()
    }

    /// Number of built entries.
    pub fn len(&self) -> usize {
        self.inner.slots.read().values().filter(|slot| slot.is_ready()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
