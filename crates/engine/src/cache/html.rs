//! HTML document cache entry.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use parking_lot::RwLock;
use stylehint_core::{CssRule, Result};
use tokio::sync::broadcast;

use super::{CacheContext, CacheEvent, CacheKind, EntryCore, StyleCache, build_index};
use crate::extract;
use crate::host::FileHandle;

/// Inline style candidates and stylesheet links of one HTML document.
pub struct HtmlCache {
    core: EntryCore,
    dependencies: RwLock<Vec<PathBuf>>,
}

impl HtmlCache {
    /// Build an entry without reading the file yet.
    pub fn new(file: FileHandle, context: Arc<CacheContext>) -> Self {
        Self { core: EntryCore::new(file, context), dependencies: RwLock::new(Vec::new()) }
    }

    /// Resolved stylesheet paths in document order, duplicates included.
    pub fn dependencies(&self) -> Vec<PathBuf> {
        self.dependencies.read().clone()
    }

    /// Parse every inline `<style>` block concurrently.
    ///
    /// Blocks the parser rejects are logged and skipped.
    async fn fetch_inline_rules(&self, text: &str) -> Vec<(String, Vec<CssRule>)> {
        let blocks = extract::inline_style_blocks(text);
        let parser = self.core.context().parser();
        let path = self.path();

        let parsed = join_all(blocks.into_iter().map(|block| async move {
            match parser.parse_stylesheet(&block).await {
                Ok(rules) => Some((block, rules)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "inline style block failed to parse");
                    None
                }
            }
        }))
        .await;

        parsed.into_iter().flatten().collect()
    }
}

#[async_trait]
impl StyleCache for HtmlCache {
    fn path(&self) -> &Path {
        self.core.path()
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Html
    }

    /// Clear, then survey links and parse inline styles side by side.
    ///
    /// The inline index is built off the runtime and swapped in together
    /// with the dependency list. `FetchComplete` is broadcast once both
    /// halves are done.
    async fn fetch(&self) -> Result<()> {
        self.core.ensure_live()?;
        let generation = self.core.begin_fetch();
        let started = Utc::now();
        self.clear_cache();

        let (text, stat) = self.core.read().await?;
        let root = self.core.context().project_root();

        let survey = async { extract::survey_dependencies(&text, self.path(), root.as_deref()) };
        let (dependencies, blocks) = tokio::join!(survey, self.fetch_inline_rules(&text));
        let block_count = blocks.len();

        let fresh = build_index(blocks).await?;
        let installed = self.core.install(generation, fresh, || *self.dependencies.write() = dependencies.clone())?;
        if !installed {
            return Ok(());
        }
        self.core.mark_indexed(started, &stat);

        tracing::debug!(
            path = %self.path().display(),
            blocks = block_count,
            dependencies = dependencies.len(),
            "indexed document"
        );
        self.core.emit(CacheEvent::FetchComplete { path: self.path().to_path_buf(), dependencies });
        Ok(())
    }

    fn search_class(&self, query: &str, tag_name: &str, ignore: &HashSet<String>) -> Vec<String> {
        self.core.search_class(query, tag_name, ignore)
    }

    fn search_id(&self, query: &str) -> Vec<String> {
        self.core.search_id(query)
    }

    /// Empty the index and forget the dependency list.
    fn clear_cache(&self) {
        if self.is_disposed() {
            return;
        }
        self.core.clear_index();
        self.dependencies.write().clear();
    }

    fn dispose(&self) {
        if self.core.begin_dispose() {
            self.dependencies.write().clear();
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
