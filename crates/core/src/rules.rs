//! Structured rule list produced by a stylesheet parser.
//!
//! Only the shape the selector index needs is modelled: plain style rules
//! carry their selector text, media rules carry their nested rules, and
//! every other at-rule collapses to [`CssRule::Other`].

/// A single rule of a parsed stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssRule {
    /// A plain style rule such as `div.card, #main { ... }`.
    Style(StyleRule),
    /// An `@media` block and the rules nested inside it.
    Media(Vec<CssRule>),
    /// Keyframes, font-face, imports and every other rule kind.
    Other,
}

/// A plain style rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Selector list as serialized by the parser, possibly lower-cased.
    pub selector_text: String,
}

impl StyleRule {
    pub fn new(selector_text: impl Into<String>) -> Self {
        Self { selector_text: selector_text.into() }
    }
}

impl CssRule {
    /// Shorthand for a style rule with the given selector text.
    pub fn style(selector_text: impl Into<String>) -> Self {
        CssRule::Style(StyleRule::new(selector_text))
    }
}

/// Collect the style rules of `rules`, descending one level into media rules.
///
/// Rules nested deeper than one media level are ignored, as are all
/// non-style rules.
pub fn flatten_style_rules(rules: &[CssRule]) -> Vec<&StyleRule> {
    let mut styles = Vec::new();
    for rule in rules {
        match rule {
            CssRule::Style(style) => styles.push(style),
            CssRule::Media(nested) => styles.extend(nested.iter().filter_map(|inner| match inner {
                CssRule::Style(style) => Some(style),
                _ => None,
            })),
            CssRule::Other => {}
        }
    }
    styles
}
