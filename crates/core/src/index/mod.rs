//! Tag-scoped index of class and id selector candidates.
//!
//! The index keeps one ordered, duplicate-free set of class names per tag
//! (`""` holds classes usable on any element) and one ordered set of ids.
//! Names keep the case they were authored with.
//!
//! ### Lifecycle
//! - `clear` empties both containers.
//! - `dispose` drops both containers; after that every call is a no-op and
//!   searches return nothing.

mod selector;

pub use selector::{CaseIndex, SelectorToken, tokenize};

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use regex::{Regex, RegexBuilder};

use crate::rules::{CssRule, flatten_style_rules};

/// Bucket key for classes not qualified by a tag.
pub const ANY_TAG: &str = "";

/// Class and id candidates extracted from stylesheet rules.
#[derive(Debug, Clone)]
pub struct SelectorIndex {
    classes: Option<IndexMap<String, IndexSet<String>>>,
    ids: Option<IndexSet<String>>,
}

impl Default for SelectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self { classes: Some(IndexMap::new()), ids: Some(IndexSet::new()) }
    }

    /// Whether `dispose` has been called.
    pub fn is_disposed(&self) -> bool {
        self.classes.is_none() || self.ids.is_none()
    }

    /// Index every class and id found in `rules`.
    ///
    /// `source` is the raw stylesheet text the rules were parsed from; it is
    /// scanned once to recover the authored case of each name, since parsers
    /// may lower-case selectors. Names that cannot be found in `source` are
    /// dropped.
    pub fn parse_rules(&mut self, rules: &[CssRule], source: &str) {
        if self.is_disposed() {
            return;
        }

        let cases = CaseIndex::build(source);
        for rule in flatten_style_rules(rules) {
            for token in tokenize(&rule.selector_text) {
                if let Some(id) = &token.id
                    && let Some(cased) = cases.id(id)
                {
                    self.add_id(&cased);
                }

                for class in &token.classes {
                    if let Some(cased) = cases.class(class) {
                        self.add_class(&cased, Some(token.tag.as_str()));
                    }
                }
            }
        }
    }

    /// Add a class name to the bucket of `tag_name`.
    ///
    /// `None` and `*` both mean "any element". Tag names are compared
    /// case-insensitively.
    pub fn add_class(&mut self, class_name: &str, tag_name: Option<&str>) {
        let Some(classes) = self.classes.as_mut() else {
            return;
        };

        let tag = normalize_tag(tag_name);
        let bucket = classes.entry(tag).or_default();
        if !bucket.contains(class_name) {
            bucket.insert(class_name.to_string());
        }
    }

    /// Add an id.
    pub fn add_id(&mut self, id_name: &str) {
        let Some(ids) = self.ids.as_mut() else {
            return;
        };

        if !ids.contains(id_name) {
            ids.insert(id_name.to_string());
        }
    }

    /// Classes of the `tag_name` bucket matching `query`, minus `ignore`.
    ///
    /// Matching is a case-insensitive substring test; an empty query matches
    /// every class. Results keep insertion order.
    pub fn search_class(&self, query: &str, tag_name: &str, ignore: &HashSet<String>) -> Vec<String> {
        let Some(classes) = self.classes.as_ref() else {
            return Vec::new();
        };
        let Some(bucket) = classes.get(&normalize_tag(Some(tag_name))) else {
            return Vec::new();
        };
        let Some(matcher) = query_matcher(query) else {
            return Vec::new();
        };

        bucket
            .iter()
            .filter(|class| !ignore.contains(class.as_str()) && matcher.is_match(class))
            .cloned()
            .collect()
    }

    /// Ids matching `query`, in insertion order.
    pub fn search_id(&self, query: &str) -> Vec<String> {
        let Some(ids) = self.ids.as_ref() else {
            return Vec::new();
        };
        let Some(matcher) = query_matcher(query) else {
            return Vec::new();
        };

        ids.iter().filter(|id| matcher.is_match(id)).cloned().collect()
    }

    /// Number of distinct classes across all buckets plus the number of ids.
    pub fn len(&self) -> usize {
        let classes = self.classes.as_ref().map_or(0, |c| c.values().map(IndexSet::len).sum::<usize>());
        classes + self.ids.as_ref().map_or(0, IndexSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty both containers. Does nothing once disposed.
    pub fn clear(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.classes = Some(IndexMap::new());
        self.ids = Some(IndexSet::new());
    }

    /// Drop both containers for good.
    pub fn dispose(&mut self) {
        self.classes = None;
        self.ids = None;
    }
}

fn normalize_tag(tag_name: Option<&str>) -> String {
    match tag_name {
        None | Some("*") => ANY_TAG.to_string(),
        Some(tag) => tag.to_ascii_lowercase(),
    }
}

fn query_matcher(query: &str) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(query)).case_insensitive(true).build() {
        Ok(matcher) => Some(matcher),
        Err(e) => {
            tracing::warn!(query, error = %e, "unusable search query");
            None
        }
    }
}
