//! Stylesheet link classification and path resolution.
//!
//! Paths are handled as `/`-separated strings so that hrefs taken from HTML
//! resolve the same way on every platform.

use std::path::{Path, PathBuf};

/// Collapse `.` and `..` segments and repeated separators.
///
/// `..` at the top of a relative path is dropped rather than kept, and a
/// leading `/` survives the collapse.
pub fn resolve_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            segment => stack.push(segment),
        }
    }

    let joined = stack.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

/// Whether an href points outside the project (`http://`, `https://`, `//host`).
pub fn is_external_href(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

/// Strip the query string and fragment from an href.
pub fn strip_query(href: &str) -> &str {
    href.find(['?', '#']).map_or(href, |end| &href[..end])
}

/// Whether an href names a local `.css` file.
pub fn is_local_stylesheet_href(href: &str) -> bool {
    let path = strip_query(href.trim());
    !path.is_empty() && !is_external_href(path) && path.to_ascii_lowercase().ends_with(".css")
}

/// Resolve a stylesheet href found in `document` to a project path.
///
/// Root-relative hrefs (`/css/site.css`) resolve against `project_root`, or
/// against the file system root when no project is open. Every other href
/// resolves against the document's own directory.
pub fn resolve_href(href: &str, document: &Path, project_root: Option<&Path>) -> PathBuf {
    let href = strip_query(href.trim());

    let base = if href.starts_with('/') {
        project_root.map(slashed).unwrap_or_default()
    } else {
        document.parent().map(slashed).unwrap_or_default()
    };

    PathBuf::from(resolve_path(&format!("{base}/{href}")))
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
