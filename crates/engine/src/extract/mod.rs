//! HTML extraction for the HTML cache.
//!
//! ### Dependencies
//! - Every `<link href>` naming a local `.css` file, in document order.
//! - Root-relative hrefs resolve against the project root, the rest against
//!   the document's directory.
//!
//! ### Inline styles
//! - The raw text of every `<style>` element, in document order.
//!
//! Both run synchronously over a parsed document that is dropped before the
//! caller awaits anything.

pub mod links;
pub mod styles;

pub use links::{stylesheet_hrefs, survey_dependencies};
pub use styles::inline_style_blocks;
