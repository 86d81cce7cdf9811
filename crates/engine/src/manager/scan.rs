//! Project scanning and periodic update checks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::CacheManager;
use crate::cache::StyleCache;
use crate::host::FileHandle;

impl CacheManager {
    /// Reset the registry and pre-build a CSS entry for every stylesheet
    /// under `root`.
    ///
    /// Also used for project refresh. Returns the number of entries built.
    pub async fn on_project_open(&self, root: &Path) -> usize {
        self.reset();
        self.inner.context.set_project_root(Some(root.to_path_buf()));

        let stylesheets = self.collect_stylesheets(root).await;
        let found = stylesheets.len();

        let created = join_all(stylesheets.into_iter().map(|path| self.create_css_cache(FileHandle::new(path)))).await;
        let cached = created.iter().flatten().count();

        tracing::info!(root = %root.display(), found, cached, "project stylesheets cached");
        cached
    }

    /// Walk `root` and collect every file with a stylesheet extension.
    ///
    /// Directories named in `exclude_dirs` are skipped. Directories that
    /// can't be listed are logged and skipped.
    async fn collect_stylesheets(&self, root: &Path) -> Vec<PathBuf> {
        let fs = self.inner.context.fs();
        let config = self.config();
        let mut pending = vec![root.to_path_buf()];
        let mut stylesheets = Vec::new();

        while let Some(dir) = pending.pop() {
            let entries = match fs.list_directory(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "could not list directory");
                    continue;
                }
            };

            for entry in entries {
                if entry.is_directory && !config.is_excluded_dir(&entry.name) {
                    pending.push(entry.path);
                } else if entry.is_file && config.is_stylesheet(&entry.path) {
                    stylesheets.push(entry.path);
                }
            }
        }

        stylesheets
    }

    /// Check every CSS entry for changes on disk.
    ///
    /// Entries whose file disappeared dispose themselves. Returns the number
    /// of entries refetched.
    pub async fn check_for_updates(&self) -> usize {
        let entries = self.css_entries();
        let results = join_all(entries.iter().map(|entry| entry.check_update())).await;

        let mut refreshed = 0;
        for (entry, result) in entries.iter().zip(results) {
            match result {
                Ok(true) => refreshed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(path = %entry.path().display(), error = %e, "update check failed"),
            }
        }
        refreshed
    }

    /// Run [`CacheManager::check_for_updates`] every `check_interval_ms`.
    ///
    /// The task holds a weak reference and stops once every clone of the
    /// manager is dropped. Abort the handle to stop it earlier.
    pub fn spawn_update_checker(&self) -> JoinHandle<()> {
        let manager = Arc::downgrade(&self.inner);
        let period = self.config().check_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = manager.upgrade() else {
                    break;
                };

                let refreshed = CacheManager { inner }.check_for_updates().await;
                if refreshed > 0 {
                    tracing::debug!(refreshed, "stylesheets refreshed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::host::memory::MemoryFs;
    use crate::manager::testing::{eventually, manager, manager_with};
    use stylehint_core::{ANY_TAG, CacheConfig};

    #[tokio::test]
    async fn test_project_open_caches_stylesheets() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/proj/a.css", ".A {}");
        fs.write("/proj/sub/deep/b.CSS", ".B {}");
        fs.write("/proj/node_modules/lib/x.css", ".X {}");
        fs.write("/proj/index.html", "<p></p>");
        let config = CacheConfig { exclude_dirs: vec!["node_modules".into()], ..Default::default() };
        let manager = manager_with(&fs, config);

        let cached = manager.on_project_open(Path::new("/proj")).await;

        assert_eq!(cached, 2);
        let mut paths = manager.css_paths();
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("/proj/a.css"), PathBuf::from("/proj/sub/deep/b.CSS")]);
        assert_eq!(manager.project_root(), Some(PathBuf::from("/proj")));
    }

    #[tokio::test]
    async fn test_project_open_resets_registry() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/old/x.html", "<style>.X {}</style>");
        fs.write("/proj/a.css", ".A {}");
        let manager = manager(&fs);
        let old = manager.create_html_cache("/old/x.html").await.unwrap();

        manager.on_project_open(Path::new("/proj")).await;

        assert!(old.is_disposed());
        assert!(!manager.contains(Path::new("/old/x.html")));
        assert_eq!(manager.css_paths(), vec![PathBuf::from("/proj/a.css")]);
    }

    #[tokio::test]
    async fn test_project_open_missing_root() {
        let fs = Arc::new(MemoryFs::new());
        let manager = manager(&fs);

        assert_eq!(manager.on_project_open(Path::new("/nowhere")).await, 0);
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_check_for_updates() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/a.css", ".One {}");
        fs.write("/b.css", ".Two {}");
        let manager = manager(&fs);
        let a = manager.create_css_cache("/a.css").await.unwrap();
        let b = manager.create_css_cache("/b.css").await.unwrap();

        assert_eq!(manager.check_for_updates().await, 0);

        fs.update("/a.css", ".Three {}");
        fs.remove(Path::new("/b.css"));
        assert_eq!(manager.check_for_updates().await, 1);

        assert_eq!(a.search_class("", ANY_TAG, &Default::default()), vec!["Three"]);
        assert!(b.is_disposed());
        assert!(eventually(|| !manager.contains(Path::new("/b.css"))).await);
    }

    #[tokio::test]
    async fn test_update_checker_refreshes_and_stops() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/a.css", ".Before {}");
        let manager = manager_with(&fs, CacheConfig { check_interval_ms: 20, ..Default::default() });
        let cache = manager.create_css_cache("/a.css").await.unwrap();
        let checker = manager.spawn_update_checker();

        fs.update("/a.css", ".After {}");
        assert!(eventually(|| cache.search_class("", ANY_TAG, &Default::default()) == vec!["After"]).await);

        drop(manager);
        assert!(tokio::time::timeout(Duration::from_secs(2), checker).await.is_ok());
    }
}
