//! Stylesheet link harvesting from HTML documents.

use std::path::{Path, PathBuf};

use scraper::{Html, Selector};
use stylehint_core::path::{is_local_stylesheet_href, resolve_href};

/// Hrefs of every `<link>` that names a local stylesheet, in document order.
///
/// External URLs and non-`.css` links are skipped. Duplicates are kept.
pub fn stylesheet_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("link[href]").expect("invalid selector");

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter(|href| is_local_stylesheet_href(href))
        .map(|href| href.trim().to_string())
        .collect()
}

/// Resolve the local stylesheet links of `document` to project paths.
pub fn survey_dependencies(html: &str, document: &Path, project_root: Option<&Path>) -> Vec<PathBuf> {
    stylesheet_hrefs(html).iter().map(|href| resolve_href(href, document, project_root)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survey_skips_external() {
        let html = r#"
            <html>
                <head>
                    <link rel="stylesheet" href="style.css">
                    <link rel="stylesheet" href="http://cdn/a.css">
                    <link rel="stylesheet" href="//cdn/b.css">
                </head>
            </html>
        "#;

        let deps = survey_dependencies(html, Path::new("/proj/index.html"), Some(Path::new("/proj")));
        assert_eq!(deps, vec![PathBuf::from("/proj/style.css")]);
    }

    #[test]
    fn test_survey_resolves_relative_and_root() {
        let html = r#"
            <link href="../css/site.css" rel="stylesheet">
            <link href="/theme/dark.CSS" rel="stylesheet">
            <link href="./local.css?v=2" rel="stylesheet">
        "#;

        let deps = survey_dependencies(html, Path::new("/proj/pages/about.html"), Some(Path::new("/proj/")));
        assert_eq!(
            deps,
            vec![
                PathBuf::from("/proj/css/site.css"),
                PathBuf::from("/proj/theme/dark.CSS"),
                PathBuf::from("/proj/pages/local.css"),
            ]
        );
    }

    #[test]
    fn test_survey_keeps_duplicates_and_order() {
        let html = r#"<link href="b.css"><link href="a.css"><link href="b.css">"#;

        let deps = survey_dependencies(html, Path::new("/p/i.html"), None);
        assert_eq!(deps, vec![PathBuf::from("/p/b.css"), PathBuf::from("/p/a.css"), PathBuf::from("/p/b.css")]);
    }

    #[test]
    fn test_stylesheet_hrefs_ignores_other_links() {
        let html = r#"
            <link rel="icon" href="favicon.ico">
            <link rel="stylesheet">
            <a href="page.css">not a link tag</a>
        "#;

        assert!(stylesheet_hrefs(html).is_empty());
    }
}
