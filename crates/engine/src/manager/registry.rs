//! Registry slots, single-flight construction and removal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use stylehint_core::{Error, Result};
use tokio::sync::OnceCell;

use super::CacheManager;
use crate::cache::{CacheContext, CacheKind, CssCache, HtmlCache, StyleCache};
use crate::host::FileHandle;

/// Source of slot ids, so a stale listener can't remove a newer entry that
/// reuses its path.
static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

type Cell<E> = Arc<OnceCell<Arc<E>>>;

/// A file named either by path or by an already resolved handle.
///
/// Asking for an existing entry by path refreshes it; asking by handle does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    Path(PathBuf),
    Handle(FileHandle),
}

impl FileRef {
    pub fn path(&self) -> &Path {
        match self {
            FileRef::Path(path) => path,
            FileRef::Handle(handle) => &handle.path,
        }
    }
}

impl From<PathBuf> for FileRef {
    fn from(path: PathBuf) -> Self {
        FileRef::Path(path)
    }
}

impl From<&Path> for FileRef {
    fn from(path: &Path) -> Self {
        FileRef::Path(path.to_path_buf())
    }
}

impl From<&str> for FileRef {
    fn from(path: &str) -> Self {
        FileRef::Path(PathBuf::from(path))
    }
}

impl From<FileHandle> for FileRef {
    fn from(handle: FileHandle) -> Self {
        FileRef::Handle(handle)
    }
}

pub(crate) enum SlotCell {
    Html(Cell<HtmlCache>),
    Css(Cell<CssCache>),
}

pub(crate) struct Slot {
    id: u64,
    cell: SlotCell,
}

impl Slot {
    fn kind(&self) -> CacheKind {
        match self.cell {
            SlotCell::Html(_) => CacheKind::Html,
            SlotCell::Css(_) => CacheKind::Css,
        }
    }

    /// Whether construction finished and the entry is stored.
    pub(super) fn is_ready(&self) -> bool {
        match &self.cell {
            SlotCell::Html(cell) => cell.initialized(),
            SlotCell::Css(cell) => cell.initialized(),
        }
    }

    pub(super) fn entry(&self) -> Option<Arc<dyn StyleCache>> {
        match &self.cell {
            SlotCell::Html(cell) => cell.get().map(|entry| entry.clone() as Arc<dyn StyleCache>),
            SlotCell::Css(cell) => cell.get().map(|entry| entry.clone() as Arc<dyn StyleCache>),
        }
    }
}

/// Entry kinds the registry can build.
pub(crate) trait Entry: StyleCache + Sized + 'static {
    const KIND: CacheKind;

    fn build(file: FileHandle, context: Arc<CacheContext>) -> Self;

    fn slot_cell(cell: Cell<Self>) -> SlotCell;

    fn cell(slot: &SlotCell) -> Option<&Cell<Self>>;
}

impl Entry for HtmlCache {
    const KIND: CacheKind = CacheKind::Html;

    fn build(file: FileHandle, context: Arc<CacheContext>) -> Self {
        HtmlCache::new(file, context)
    }

    fn slot_cell(cell: Cell<Self>) -> SlotCell {
        SlotCell::Html(cell)
    }

    fn cell(slot: &SlotCell) -> Option<&Cell<Self>> {
        match slot {
            SlotCell::Html(cell) => Some(cell),
            SlotCell::Css(_) => None,
        }
    }
}

impl Entry for CssCache {
    const KIND: CacheKind = CacheKind::Css;

    fn build(file: FileHandle, context: Arc<CacheContext>) -> Self {
        CssCache::new(file, context)
    }

    fn slot_cell(cell: Cell<Self>) -> SlotCell {
        SlotCell::Css(cell)
    }

    fn cell(slot: &SlotCell) -> Option<&Cell<Self>> {
        match slot {
            SlotCell::Css(cell) => Some(cell),
            SlotCell::Html(_) => None,
        }
    }
}

/// Log a failed fetch. Disposal mid-fetch is expected and stays quiet.
pub(super) fn log_fetch_failure(path: &Path, err: &Error) {
    match err {
        Error::Disposed => tracing::debug!(path = %path.display(), "fetch discarded: cache disposed"),
        _ => tracing::warn!(path = %path.display(), error = %err, "fetch failed"),
    }
}

impl CacheManager {
    /// Return the entry for `file`, building it on first request.
    ///
    /// A path is resolved first and the entry is keyed on the resolved path.
    /// Concurrent callers for one path share a single construction. A
    /// caller that finds an existing entry by path refreshes it.
    pub(crate) async fn get_or_create<E: Entry>(&self, file: FileRef) -> Option<Arc<E>> {
        let by_path = matches!(file, FileRef::Path(_));
        let handle = match file {
            FileRef::Handle(handle) => handle,
            FileRef::Path(path) => match self.inner.context.fs().resolve(&path).await {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not create cache");
                    return None;
                }
            },
        };
        let path = handle.path.clone();

        let (id, cell) = match self.claim_slot::<E>(&path) {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::warn!(requested = E::KIND.as_str(), error = %e, "cache kind mismatch");
                return None;
            }
        };

        let mut created = false;
        let created_flag = &mut created;
        let key = path.clone();
        let entry = cell
            .get_or_init(move || async move {
                *created_flag = true;
                let entry = Arc::new(E::build(handle, self.inner.context.clone()));
                self.watch(key, id, entry.subscribe());
                if let Err(e) = entry.fetch().await {
                    log_fetch_failure(entry.path(), &e);
                }
                entry
            })
            .await
            .clone();

        if !self.is_registered(&path, id) {
            if created {
                entry.dispose();
            }
            return None;
        }

        if !created
            && by_path
            && let Err(e) = entry.fetch().await
        {
            log_fetch_failure(&path, &e);
        }

        Some(entry)
    }

    /// Find or insert the slot for `path`, refusing a slot of the other kind.
    fn claim_slot<E: Entry>(&self, path: &Path) -> Result<(u64, Cell<E>)> {
        let mut slots = self.inner.slots.write();
        if let Some(slot) = slots.get(path) {
            return match E::cell(&slot.cell) {
                Some(cell) => Ok((slot.id, cell.clone())),
                None => Err(Error::KindMismatch { path: path.to_path_buf(), registered: slot.kind().as_str() }),
            };
        }

        let id = NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed);
        let cell: Cell<E> = Arc::new(OnceCell::new());
        slots.insert(path.to_path_buf(), Slot { id, cell: E::slot_cell(cell.clone()) });
        Ok((id, cell))
    }

    pub(super) fn lookup<E: Entry>(&self, path: &Path) -> Option<Arc<E>> {
        let slots = self.inner.slots.read();
        slots.get(path).and_then(|slot| E::cell(&slot.cell)).and_then(|cell| cell.get().cloned())
    }

    /// The built entry at `path`, whatever its kind.
    pub(super) fn entry(&self, path: &Path) -> Option<Arc<dyn StyleCache>> {
        self.inner.slots.read().get(path).and_then(Slot::entry)
    }

    /// Every built CSS entry in registration order.
    pub(super) fn css_entries(&self) -> Vec<Arc<CssCache>> {
        self.inner
            .slots
            .read()
            .values()
            .filter_map(|slot| match &slot.cell {
                SlotCell::Css(cell) => cell.get().cloned(),
                SlotCell::Html(_) => None,
            })
            .collect()
    }

    fn is_registered(&self, path: &Path, id: u64) -> bool {
        self.inner.slots.read().get(path).is_some_and(|slot| slot.id == id)
    }

    /// Drop the slot at `path` if it still belongs to slot `id`.
    pub(super) fn unregister(&self, path: &Path, id: u64) -> bool {
        let mut slots = self.inner.slots.write();
        if slots.get(path).is_some_and(|slot| slot.id == id) {
            slots.shift_remove(path);
            return true;
        }
        false
    }

    /// Dispose and forget the entry at `path`.
    ///
    /// Returns false when nothing is registered there.
    pub fn remove_cache(&self, path: &Path) -> bool {
        let removed = self.inner.slots.write().shift_remove(path);
        let Some(slot) = removed else {
            tracing::debug!(path = %path.display(), "no cache to remove");
            return false;
        };

        if let Some(entry) = slot.entry() {
            entry.dispose();
        }
        true
    }

    /// Dispose every entry and empty the registry.
    pub fn reset(&self) {
        let slots = std::mem::take(&mut *self.inner.slots.write());
        let disposed = slots.len();
        for slot in slots.values() {
            if let Some(entry) = slot.entry() {
                entry.dispose();
            }
        }
        tracing::debug!(disposed, "cache registry reset");
    }
}
