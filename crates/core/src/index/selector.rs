//! Selector tokenizing and case recovery.

use std::collections::{HashMap, HashSet};

/// One simple selector: optional tag, optional id, zero or more classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorToken {
    /// Tag qualifier as written; empty when absent.
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl SelectorToken {
    fn is_empty(&self) -> bool {
        self.tag.is_empty() && self.id.is_none() && self.classes.is_empty()
    }
}

/// Split a selector list into simple selector tokens.
///
/// Groups are split on `,` and descendants on whitespace. Pseudo-classes and
/// pseudo-elements, attribute brackets and the `>`, `+`, `~` combinators are
/// stripped rather than interpreted.
pub fn tokenize(selector_text: &str) -> Vec<SelectorToken> {
    selector_text
        .split(',')
        .flat_map(str::split_whitespace)
        .map(|raw| parse_token(&strip_token(raw)))
        .filter(|token| !token.is_empty())
        .collect()
}

fn strip_token(raw: &str) -> String {
    let without_attr = match (raw.find('['), raw.rfind(']')) {
        (Some(open), Some(close)) if close > open + 1 => format!("{}{}", &raw[..open], &raw[close + 1..]),
        _ => raw.to_string(),
    };

    let without_pseudo = without_attr.find(':').map_or(without_attr.as_str(), |start| &without_attr[..start]);
    without_pseudo.replace(['>', '+', '~'], "")
}

fn parse_token(stripped: &str) -> SelectorToken {
    let mut parts = stripped.split('.');
    let head = parts.next().unwrap_or_default();
    let classes = parts.filter(|class| !class.is_empty()).map(str::to_string).collect();

    let mut head_parts = head.split('#');
    let tag = head_parts.next().unwrap_or_default().to_string();
    let id = head_parts.next().filter(|id| !id.is_empty()).map(str::to_string);

    SelectorToken { tag, id, classes }
}

/// Authored spellings of every `.class` and `#id` in a stylesheet's selector
/// preludes, collected in one pass over the raw text.
///
/// A prelude is the text between a brace (or the start) and the next `{`.
/// Declaration blocks end at `}` and are never scanned, so `url(a.Logo.png)`
/// or `color: #ABC` contribute nothing.
#[derive(Debug, Default)]
pub struct CaseIndex {
    classes: Spellings,
    ids: Spellings,
}

impl CaseIndex {
    pub fn build(source: &str) -> Self {
        let mut index = Self::default();
        let mut start = 0;
        for (pos, brace) in source.match_indices(['{', '}']) {
            if brace == "{" {
                index.scan_prelude(&source[start..pos]);
            }
            start = pos + 1;
        }
        index
    }

    fn scan_prelude(&mut self, prelude: &str) {
        for (pos, sigil) in prelude.match_indices(['.', '#']) {
            let rest = &prelude[pos + 1..];
            let name = &rest[..rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len())];
            if name.is_empty() {
                continue;
            }
            match sigil {
                "." => self.classes.insert(name),
                _ => self.ids.insert(name),
            }
        }
    }

    /// Authored spelling of class `name`, see [`CaseIndex::id`].
    pub fn class(&self, name: &str) -> Option<String> {
        self.classes.recover(name)
    }

    /// Authored spelling of id `name`.
    ///
    /// A name written exactly this way is returned unchanged; otherwise the
    /// first case-insensitive match wins. `None` when the name never occurs
    /// in a prelude.
    pub fn id(&self, name: &str) -> Option<String> {
        self.ids.recover(name)
    }
}

#[derive(Debug, Default)]
struct Spellings {
    exact: HashSet<String>,
    folded: HashMap<String, String>,
}

impl Spellings {
    fn insert(&mut self, name: &str) {
        if self.exact.insert(name.to_string()) {
            self.folded.entry(name.to_lowercase()).or_insert_with(|| name.to_string());
        }
    }

    fn recover(&self, name: &str) -> Option<String> {
        if self.exact.contains(name) {
            return Some(name.to_string());
        }
        self.folded.get(&name.to_lowercase()).cloned()
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(tag: &str, id: Option<&str>, classes: &[&str]) -> SelectorToken {
        SelectorToken {
            tag: tag.to_string(),
            id: id.map(str::to_string),
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_tokenize_groups_and_descendants() {
        let tokens = tokenize("div.card .title, #main");
        assert_eq!(
            tokens,
            vec![token("div", None, &["card"]), token("", None, &["title"]), token("", Some("main"), &[])]
        );
    }

    #[test]
    fn test_tokenize_compound() {
        let tokens = tokenize("a#nav.link.active");
        assert_eq!(tokens, vec![token("a", Some("nav"), &["link", "active"])]);
    }

    #[test]
    fn test_tokenize_strips_pseudo_and_attributes() {
        let tokens = tokenize("a.btn:hover input[type=text].field li::before");
        assert_eq!(
            tokens,
            vec![token("a", None, &["btn"]), token("input", None, &["field"]), token("li", None, &[])]
        );
    }

    #[test]
    fn test_tokenize_attribute_with_colon() {
        let tokens = tokenize(r#"a[href="http://x"].ext:hover"#);
        assert_eq!(tokens, vec![token("a", None, &["ext"])]);
    }

    #[test]
    fn test_tokenize_skips_combinators() {
        let tokens = tokenize("ul > li + li ~ .x");
        assert_eq!(
            tokens,
            vec![token("ul", None, &[]), token("li", None, &[]), token("li", None, &[]), token("", None, &["x"])]
        );
    }

    #[test]
    fn test_tokenize_glued_combinator() {
        let tokens = tokenize("ul>.item");
        assert_eq!(tokens, vec![token("ul", None, &["item"])]);
    }

    #[test]
    fn test_tokenize_universal_and_empty() {
        assert_eq!(tokenize("*.util"), vec![token("*", None, &["util"])]);
        assert!(tokenize(" , ").is_empty());
        assert!(tokenize(":root").is_empty());
    }

    #[test]
    fn test_case_index_class() {
        let cases = CaseIndex::build(".Foo.bar{}");
        assert_eq!(cases.class("foo"), Some("Foo".to_string()));
        assert_eq!(cases.class("bar"), Some("bar".to_string()));
    }

    #[test]
    fn test_case_index_keeps_exact_variants() {
        let cases = CaseIndex::build(".Foo {} .foo {}");
        assert_eq!(cases.class("foo"), Some("foo".to_string()));
        assert_eq!(cases.class("Foo"), Some("Foo".to_string()));
        assert_eq!(cases.class("FOO"), Some("Foo".to_string()));
    }

    #[test]
    fn test_case_index_across_lines() {
        let cases = CaseIndex::build(".Header,\n.Footer\n{\n  margin: 0;\n}");
        assert_eq!(cases.class("header"), Some("Header".to_string()));
        assert_eq!(cases.class("footer"), Some("Footer".to_string()));
    }

    #[test]
    fn test_case_index_ignores_prefix_match() {
        let cases = CaseIndex::build(".FooBar {}");
        assert_eq!(cases.class("foo"), None);
        assert_eq!(cases.class("foobar"), Some("FooBar".to_string()));
    }

    #[test]
    fn test_case_index_ignores_declarations() {
        let cases = CaseIndex::build(".a { background: url(img.Logo.png); } p { color: #ABC; }");
        assert_eq!(cases.class("logo"), None);
        assert_eq!(cases.id("abc"), None);
    }

    #[test]
    fn test_case_index_id_and_nesting() {
        let cases = CaseIndex::build("@media print { div#MainNav > a.Link:hover {} }");
        assert_eq!(cases.id("mainnav"), Some("MainNav".to_string()));
        assert_eq!(cases.class("link"), Some("Link".to_string()));
        assert_eq!(cases.class("mainnav"), None);
    }

    #[test]
    fn test_case_index_unknown_names() {
        let cases = CaseIndex::build(".a1 {}");
        assert_eq!(cases.class("a."), None);
        assert_eq!(cases.class(""), None);
        assert_eq!(CaseIndex::build("").id("x"), None);
    }
}
