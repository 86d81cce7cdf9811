//! Cache engine for stylehint.
//!
//! This crate provides the host collaborator contracts, HTML extraction,
//! per-file CSS and HTML cache entries, and the cache manager that ties
//! them to editor and file system events.

pub mod cache;
pub mod extract;
pub mod host;
pub mod manager;

pub use cache::{CacheContext, CacheEvent, CacheKind, CssCache, HtmlCache, StyleCache};
pub use host::{DirEntry, FileHandle, FileStat, FileSystem, LightningParser, LocalFs, StylesheetParser};
pub use manager::{ActiveEditor, CacheManager, ClassCandidates, FileRef, FsChange};
