//! HTML parsing infrastructure for retailer product pages
//!
//! Trait-based parsing with ordered fallback strategies: configured CSS
//! selectors, structured metadata, inline script data and a text scan.

pub mod cascade;
pub mod config;
pub mod context;
pub mod image;
pub mod patterns;
pub mod product_page_parser;
pub mod structured_data;

// Re-export public types
pub use super::parsing_error::{ParsingError, ParsingResult};
pub use config::{RetailerSelectors, SelectorConfig};
pub use context::PageContext;
pub use product_page_parser::{ExtractionOutcome, FieldSources, ProductPageParser};

use scraper::Html;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}
