//! Per-file cache entries.
//!
//! A [`CssCache`] indexes one stylesheet, an [`HtmlCache`] indexes the inline
//! `<style>` blocks of one document and tracks the stylesheets it links.
//! Both share [`EntryCore`] for the index, timestamps and lifecycle.
//!
//! ### Lifecycle
//! - An entry is built without touching the disk; the owner subscribes to
//!   its events and then calls `fetch`.
//! - `dispose` is terminal: the index is dropped, `Disposed` is broadcast
//!   and every later `fetch` fails with `Error::Disposed`.
//! - A fetch that is in flight when the entry is disposed discards its
//!   result instead of writing into the dropped index.
//! - Every fetch builds a fresh index and swaps it in whole. When fetches
//!   overlap, the one that started last wins.

mod css;
mod html;

pub use css::CssCache;
pub use html::HtmlCache;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use stylehint_core::{CacheConfig, CssRule, Error, Result, SelectorIndex};
use tokio::sync::broadcast;

use crate::host::{FileHandle, FileStat, FileSystem, StylesheetParser};

/// Buffered events per entry before a slow listener starts lagging.
const EVENT_CAPACITY: usize = 16;

/// Which kind of file an entry indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Html,
    Css,
}

impl CacheKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::Html => "html",
            CacheKind::Css => "css",
        }
    }
}

/// Notifications an entry sends to whoever subscribed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// An HTML fetch finished; `dependencies` are the linked stylesheets.
    FetchComplete { path: PathBuf, dependencies: Vec<PathBuf> },
    /// The entry was disposed and must leave the registry.
    Disposed { path: PathBuf },
}

/// Collaborators and limits shared by every entry of one manager.
pub struct CacheContext {
    fs: Arc<dyn FileSystem>,
    parser: Arc<dyn StylesheetParser>,
    max_file_bytes: u64,
    project_root: RwLock<Option<PathBuf>>,
}

impl CacheContext {
    pub fn new(fs: Arc<dyn FileSystem>, parser: Arc<dyn StylesheetParser>, config: &CacheConfig) -> Self {
        Self {
            fs,
            parser,
            max_file_bytes: config.max_file_bytes,
            project_root: RwLock::new(config.project_root.clone()),
        }
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn parser(&self) -> &dyn StylesheetParser {
        self.parser.as_ref()
    }

    /// Root that `/`-prefixed stylesheet links resolve against.
    pub fn project_root(&self) -> Option<PathBuf> {
        self.project_root.read().clone()
    }

    pub fn set_project_root(&self, root: Option<PathBuf>) {
        *self.project_root.write() = root;
    }
}

/// Behaviour shared by CSS and HTML entries.
#[async_trait]
pub trait StyleCache: Send + Sync {
    /// Registry key: the path of the backing file.
    fn path(&self) -> &Path;

    fn kind(&self) -> CacheKind;

    /// Re-read the backing file and rebuild the index.
    async fn fetch(&self) -> Result<()>;

    /// Classes of `tag_name`'s bucket matching `query`, minus `ignore`.
    fn search_class(&self, query: &str, tag_name: &str, ignore: &HashSet<String>) -> Vec<String>;

    fn search_id(&self, query: &str) -> Vec<String>;

    /// Empty the index without disposing it.
    fn clear_cache(&self);

    fn dispose(&self);

    fn is_disposed(&self) -> bool;

    /// Subscribe to this entry's events.
    fn subscribe(&self) -> broadcast::Receiver<CacheEvent>;

    /// Modification time of the backing file at the last successful read.
    fn timestamp(&self) -> Option<DateTime<Utc>>;

    /// When the last successful index build started.
    fn last_indexed_at(&self) -> Option<DateTime<Utc>>;
}

/// State common to both entry kinds.
pub(crate) struct EntryCore {
    file: FileHandle,
    context: Arc<CacheContext>,
    index: RwLock<SelectorIndex>,
    timestamp: RwLock<Option<DateTime<Utc>>>,
    last_indexed_at: RwLock<Option<DateTime<Utc>>>,
    disposed: AtomicBool,
    /// Generation handed to the most recent fetch.
    fetches: AtomicU64,
    /// Generation of the index currently installed. Written under `index`.
    installed: AtomicU64,
    events: broadcast::Sender<CacheEvent>,
}

impl EntryCore {
    fn new(file: FileHandle, context: Arc<CacheContext>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            file,
            context,
            index: RwLock::new(SelectorIndex::new()),
            timestamp: RwLock::new(None),
            last_indexed_at: RwLock::new(None),
            disposed: AtomicBool::new(false),
            fetches: AtomicU64::new(0),
            installed: AtomicU64::new(0),
            events,
        }
    }

    fn path(&self) -> &Path {
        &self.file.path
    }

    fn context(&self) -> &CacheContext {
        &self.context
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() { Err(Error::Disposed) } else { Ok(()) }
    }

    /// Stat then read the backing file, refusing files over the size limit.
    async fn read(&self) -> Result<(String, FileStat)> {
        let fs = self.context.fs();
        let stat = fs.stat(&self.file).await?;
        if stat.len > self.context.max_file_bytes {
            return Err(Error::TooLarge {
                path: self.file.path.clone(),
                size: stat.len,
                limit: self.context.max_file_bytes,
            });
        }

        let text = fs.read_text(&self.file).await?;
        Ok((text, stat))
    }

    fn begin_fetch(&self) -> u64 {
        self.fetches.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Swap in `fresh` built by fetch `generation`, running `also` under the
    /// same lock.
    ///
    /// Returns false, leaving everything untouched, when a later fetch
    /// already installed its index.
    fn install(&self, generation: u64, fresh: SelectorIndex, also: impl FnOnce()) -> Result<bool> {
        let mut index = self.index.write();
        if index.is_disposed() {
            return Err(Error::Disposed);
        }
        if generation < self.installed.load(Ordering::Acquire) {
            tracing::debug!(path = %self.file.path.display(), generation, "superseded fetch discarded");
            return Ok(false);
        }

        self.installed.store(generation, Ordering::Release);
        *index = fresh;
        also();
        Ok(true)
    }

    fn mark_indexed(&self, started: DateTime<Utc>, stat: &FileStat) {
        *self.timestamp.write() = Some(stat.modified);
        *self.last_indexed_at.write() = Some(started);
    }

    fn search_class(&self, query: &str, tag_name: &str, ignore: &HashSet<String>) -> Vec<String> {
        self.index.read().search_class(query, tag_name, ignore)
    }

    fn search_id(&self, query: &str) -> Vec<String> {
        self.index.read().search_id(query)
    }

    fn clear_index(&self) {
        self.index.write().clear();
    }

    fn index_len(&self) -> usize {
        self.index.read().len()
    }

    /// Flip the disposed flag. Returns false if it was already set.
    fn begin_dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.index.write().dispose();
        true
    }

    fn finish_dispose(&self) {
        tracing::debug!(path = %self.file.path.display(), "cache disposed");
        self.emit(CacheEvent::Disposed { path: self.file.path.clone() });
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CacheEvent) {
        // No receivers is fine: nothing registered this entry.
        let _ = self.events.send(event);
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        *self.timestamp.read()
    }

    fn last_indexed_at(&self) -> Option<DateTime<Utc>> {
        *self.last_indexed_at.read()
    }
}

/// Build an index from parsed sources on the blocking pool.
///
/// Each source pairs the raw text with the rules parsed from it.
async fn build_index(sources: Vec<(String, Vec<CssRule>)>) -> Result<SelectorIndex> {
    tokio::task::spawn_blocking(move || {
        let mut index = SelectorIndex::new();
        for (text, rules) in &sources {
            index.parse_rules(rules, text);
        }
        index
    })
    .await
    .map_err(|e| Error::ParseFailed(format!("index task failed: {e}")))
}
