//! Stylesheet cache entry.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stylehint_core::Result;
use tokio::sync::broadcast;

use super::{CacheContext, CacheEvent, CacheKind, EntryCore, StyleCache, build_index};
use crate::host::FileHandle;

/// Class and id candidates of one `.css` file.
pub struct CssCache {
    core: EntryCore,
}

impl CssCache {
    /// Build an entry without reading the file yet.
    pub fn new(file: FileHandle, context: Arc<CacheContext>) -> Self {
        Self { core: EntryCore::new(file, context) }
    }

    /// Build an entry and run its first fetch.
    ///
    /// A failed first fetch leaves the index empty; the entry is still
    /// returned so a later update check can retry.
    pub async fn open(file: FileHandle, context: Arc<CacheContext>) -> Arc<Self> {
        let cache = Arc::new(Self::new(file, context));
        if let Err(e) = cache.fetch().await {
            tracing::warn!(path = %cache.path().display(), error = %e, "initial stylesheet fetch failed");
        }
        cache
    }

    /// Refetch when the file changed since the last index build.
    ///
    /// A file that no longer exists disposes the entry. Returns whether a
    /// fetch ran.
    pub async fn check_update(&self) -> Result<bool> {
        if self.is_disposed() {
            return Ok(false);
        }

        let stat = match self.core.context().fs().stat(&self.core.file).await {
            Ok(stat) => stat,
            Err(e) if e.is_not_found() => {
                tracing::info!(path = %self.path().display(), "stylesheet removed");
                self.dispose();
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let stale = self.last_indexed_at().is_none_or(|indexed| stat.modified > indexed);
        if !stale {
            return Ok(false);
        }

        self.fetch().await?;
        tracing::info!(path = %self.path().display(), "detected update");
        Ok(true)
    }

    /// Number of indexed classes and ids.
    pub fn len(&self) -> usize {
        self.core.index_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StyleCache for CssCache {
    fn path(&self) -> &Path {
        self.core.path()
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Css
    }

    /// Parse into a fresh index and swap it in, so names removed from the
    /// stylesheet disappear.
    async fn fetch(&self) -> Result<()> {
        self.core.ensure_live()?;
        let generation = self.core.begin_fetch();
        let started = Utc::now();

        let (text, stat) = self.core.read().await?;
        let rules = self.core.context().parser().parse_stylesheet(&text).await?;
        let rule_count = rules.len();

        let fresh = build_index(vec![(text, rules)]).await?;
        let indexed = fresh.len();

        if self.core.install(generation, fresh, || {})? {
            self.core.mark_indexed(started, &stat);
            tracing::debug!(path = %self.path().display(), rules = rule_count, indexed, "indexed stylesheet");
        }
        Ok(())
    }

    fn search_class(&self, query: &str, tag_name: &str, ignore: &HashSet<String>) -> Vec<String> {
        self.core.search_class(query, tag_name, ignore)
    }

    fn search_id(&self, query: &str) -> Vec<String> {
        self.core.search_id(query)
    }

    fn clear_cache(&self) {
        self.core.clear_index();
    }

    fn dispose(&self) {
        if self.core.begin_dispose() {
            self.core.finish_dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.core.subscribe()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.core.timestamp()
    }

    fn last_indexed_at(&self) -> Option<DateTime<Utc>> {
        self.core.last_indexed_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::context;
    use crate::host::memory::MemoryFs;
    use stylehint_core::{ANY_TAG, Error};

    fn no_ignore() -> HashSet<String> {
        HashSet::new()
    }

    #[tokio::test]
    async fn test_fetch_recovers_case_and_tags() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/proj/site.css", ".Foo.bar{} div.Baz{}");

        let cache = CssCache::open(FileHandle::new("/proj/site.css"), context(&fs, None)).await;

        assert_eq!(cache.search_class("foo", ANY_TAG, &no_ignore()), vec!["Foo"]);
        assert_eq!(cache.search_class("baz", "div", &no_ignore()), vec!["Baz"]);
        assert!(cache.search_class("baz", ANY_TAG, &no_ignore()).is_empty());
        assert!(cache.timestamp().is_some());
        assert!(cache.last_indexed_at().is_some());
    }

    #[tokio::test]
    async fn test_fetch_keeps_case_variants() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/a.css", ".Foo {} .foo {}");

        let cache = CssCache::open(FileHandle::new("/a.css"), context(&fs, None)).await;

        assert_eq!(cache.search_class("", ANY_TAG, &no_ignore()), vec!["Foo", "foo"]);
    }

    #[tokio::test]
    async fn test_fetch_large_stylesheet() {
        let fs = Arc::new(MemoryFs::new());
        let source: String = (0..5000).map(|i| format!(".cls{i} {{ color: red }}\n")).collect();
        fs.write("/big.css", &source);

        let started = std::time::Instant::now();
        let cache = CssCache::open(FileHandle::new("/big.css"), context(&fs, None)).await;

        assert!(started.elapsed() < std::time::Duration::from_secs(10), "took {:?}", started.elapsed());
        assert_eq!(cache.len(), 5000);
    }

    #[tokio::test]
    async fn test_fetch_replaces_index() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/a.css", ".old {} .kept {}");
        let cache = CssCache::open(FileHandle::new("/a.css"), context(&fs, None)).await;

        fs.write("/a.css", ".kept {}");
        cache.fetch().await.unwrap();

        assert_eq!(cache.search_class("", ANY_TAG, &no_ignore()), vec!["kept"]);
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/big.css", &".x {}".repeat(10));
        let ctx = context(&fs, None);
        let ctx = Arc::new(CacheContext {
            fs: ctx.fs.clone(),
            parser: ctx.parser.clone(),
            max_file_bytes: 8,
            project_root: Default::default(),
        });

        let cache = CssCache::new(FileHandle::new("/big.css"), ctx);
        let result = cache.fetch().await;

        assert!(matches!(result, Err(Error::TooLarge { size: 50, limit: 8, .. })));
        assert!(cache.is_empty());
        assert_eq!(fs.read_count(Path::new("/big.css")), 0);
    }

    #[tokio::test]
    async fn test_check_update_refetches_when_newer() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/a.css", ".one {}");
        let cache = CssCache::open(FileHandle::new("/a.css"), context(&fs, None)).await;

        assert!(!cache.check_update().await.unwrap());

        fs.update("/a.css", ".one {} .two {}");
        assert!(cache.check_update().await.unwrap());
        assert_eq!(cache.search_class("t", ANY_TAG, &no_ignore()), vec!["two"]);
    }

    #[tokio::test]
    async fn test_check_update_disposes_removed_file() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/a.css", ".one {}");
        let cache = CssCache::open(FileHandle::new("/a.css"), context(&fs, None)).await;
        let mut events = cache.subscribe();

        fs.remove(Path::new("/a.css"));
        assert!(!cache.check_update().await.unwrap());

        assert!(cache.is_disposed());
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Disposed { path: "/a.css".into() });
        assert!(cache.search_class("", ANY_TAG, &no_ignore()).is_empty());
    }

    #[tokio::test]
    async fn test_dispose_is_terminal() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/a.css", ".one {}");
        let cache = CssCache::open(FileHandle::new("/a.css"), context(&fs, None)).await;
        let mut events = cache.subscribe();

        cache.dispose();
        cache.dispose();
        cache.clear_cache();

        assert!(matches!(cache.fetch().await, Err(Error::Disposed)));
        assert!(!cache.check_update().await.unwrap());
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Disposed { path: "/a.css".into() });
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispose_during_fetch_discards_result() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/a.css", ".one {}");
        fs.set_read_delay(std::time::Duration::from_millis(50));
        let cache = Arc::new(CssCache::new(FileHandle::new("/a.css"), context(&fs, None)));

        let pending = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch().await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        cache.dispose();

        assert!(matches!(pending.await.unwrap(), Err(Error::Disposed)));
        assert!(cache.last_indexed_at().is_none());
    }

    #[tokio::test]
    async fn test_read_failure_leaves_index_empty() {
        let fs = Arc::new(MemoryFs::new());
        let cache = CssCache::open(FileHandle::new("/missing.css"), context(&fs, None)).await;

        assert!(cache.is_empty());
        assert!(!cache.is_disposed());
        assert!(cache.last_indexed_at().is_none());
    }
}
