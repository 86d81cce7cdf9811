//! [`StylesheetParser`] backed by lightningcss.

use async_trait::async_trait;
use lightningcss::rules::CssRule as LightningRule;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;
use stylehint_core::{CssRule, Error, Result};

use super::StylesheetParser;

/// Parses stylesheets with lightningcss, recovering from invalid rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightningParser;

impl LightningParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse synchronously. The stylesheet borrows `text` and never crosses
    /// an await point.
    pub fn parse(text: &str) -> Result<Vec<CssRule>> {
        let options = ParserOptions { error_recovery: true, ..ParserOptions::default() };
        let sheet = StyleSheet::parse(text, options).map_err(|e| Error::ParseFailed(e.to_string()))?;
        Ok(convert(&sheet.rules.0))
    }
}

#[async_trait]
impl StylesheetParser for LightningParser {
    /// Runs [`LightningParser::parse`] on the blocking pool.
    async fn parse_stylesheet(&self, text: &str) -> Result<Vec<CssRule>> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || Self::parse(&text))
            .await
            .map_err(|e| Error::ParseFailed(format!("parser task failed: {e}")))?
    }
}

fn convert(rules: &[LightningRule]) -> Vec<CssRule> {
    rules
        .iter()
        .map(|rule| match rule {
            LightningRule::Style(style) => match style.selectors.to_css_string(PrinterOptions::default()) {
                Ok(selector_text) => CssRule::style(selector_text),
                Err(e) => {
                    tracing::debug!(error = %e, "unprintable selector list");
                    CssRule::Other
                }
            },
            LightningRule::Media(media) => CssRule::Media(convert(&media.rules.0)),
            _ => CssRule::Other,
        })
        .collect()
}
