//! Aggregated class and id search across a document's stylesheets.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use stylehint_core::ANY_TAG;

use super::CacheManager;
use crate::cache::StyleCache;

/// Class suggestions split by tag scoping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCandidates {
    /// Classes declared for the requested tag, such as `div.row`.
    pub specific: Vec<String>,
    /// Classes usable on any element.
    pub general: Vec<String>,
}

impl ClassCandidates {
    pub fn is_empty(&self) -> bool {
        self.specific.is_empty() && self.general.is_empty()
    }
}

impl CacheManager {
    /// Entries searched on behalf of `document`.
    ///
    /// The document's own entry comes first, followed by the stylesheets it
    /// links. When it links none, or has no entry, every registered
    /// stylesheet is searched instead.
    fn search_targets(&self, document: &Path) -> Vec<Arc<dyn StyleCache>> {
        let html = self.html_cache(document);
        let dependencies = html.as_ref().map(|html| html.dependencies()).unwrap_or_default();

        let mut targets: Vec<Arc<dyn StyleCache>> = Vec::new();
        if let Some(html) = html {
            targets.push(html);
        }

        if dependencies.is_empty() {
            targets.extend(self.css_entries().into_iter().map(|css| css as Arc<dyn StyleCache>));
        } else {
            let unique: IndexSet<_> = dependencies.into_iter().collect();
            targets.extend(unique.iter().filter_map(|path| self.css_cache(path)).map(|css| css as Arc<dyn StyleCache>));
        }

        targets.retain(|target| !target.is_disposed());
        targets
    }

    /// Class names for a `class` attribute of `document`.
    ///
    /// `general` collects tag-independent classes of every target; when
    /// `tag_name` is given, `specific` collects the classes scoped to it.
    /// Names in `ignore` (usually the classes already typed) are skipped.
    pub fn search_class(
        &self, document: &Path, query: &str, tag_name: Option<&str>, ignore: &HashSet<String>,
    ) -> ClassCandidates {
        let tag_name = tag_name.filter(|tag| !tag.is_empty());
        let mut candidates = ClassCandidates::default();

        for target in self.search_targets(document) {
            candidates.general.extend(target.search_class(query, ANY_TAG, ignore));
            if let Some(tag) = tag_name {
                candidates.specific.extend(target.search_class(query, tag, ignore));
            }
        }

        candidates
    }

    /// Ids for an `id` attribute of `document`.
    pub fn search_id(&self, document: &Path, query: &str) -> Vec<String> {
        self.search_targets(document).iter().flat_map(|target| target.search_id(query)).collect()
    }
}
