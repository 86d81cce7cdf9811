//! Inline `<style>` block extraction.

use scraper::{Html, Selector};

/// Text of every `<style>` element in document order. Empty blocks are skipped.
pub fn inline_style_blocks(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("style").expect("invalid selector");

    document
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .collect()
}
