//! Product page parser
//!
//! Builds one extraction cascade per retailer and field from the selector
//! configuration, then resolves price, title and image from fetched markup.

#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, warn};

use super::cascade::{Field, Page, Step, StepKind, run_cascade};
use super::config::{RetailerSelectors, SelectorConfig};
use super::context::PageContext;
use super::{ContextualParser, ParsingError, ParsingResult};
use crate::domain::{ProductSnapshot, Retailer};

/// Strategy label that produced each snapshot field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSources {
    pub price: String,
    /// `None` when the placeholder title was used
    pub title: Option<String>,
    /// `None` when no image was found
    pub image: Option<String>,
}

/// Snapshot plus the strategies behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionOutcome {
    pub snapshot: ProductSnapshot,
    pub sources: FieldSources,
}

/// Compiled cascades for one retailer
#[derive(Debug, Clone)]
struct RetailerCascades {
    price: Vec<Step>,
    title: Vec<Step>,
    image: Vec<Step>,
}

impl RetailerCascades {
    fn compile(selectors: &RetailerSelectors) -> Result<Self> {
        let mut price: Vec<Step> = compile_selectors(&selectors.price)?
            .into_iter()
            .map(|(raw, selector)| Step::css(&raw, selector))
            .collect();
        price.extend([
            Step::new("json-ld", StepKind::JsonLd),
            Step::new("microdata", StepKind::Microdata),
            Step::new("script-data", StepKind::ScriptData),
            Step::new("text-scan", StepKind::TextScan),
        ]);

        let mut title: Vec<Step> = compile_selectors(&selectors.title)?
            .into_iter()
            .map(|(raw, selector)| Step::css(&raw, selector))
            .collect();
        title.extend([
            Step::new("json-ld", StepKind::JsonLd),
            Step::new("og:title", StepKind::MetaTitle),
            Step::new("title-tag", StepKind::TitleTag),
        ]);

        let mut image: Vec<Step> = compile_selectors(&selectors.image_container)?
            .into_iter()
            .map(|(raw, selector)| Step::image_container(&raw, selector))
            .collect();
        image.extend([
            Step::new("document-images", StepKind::ImageDocument),
            Step::new("meta-image", StepKind::ImageMeta),
            Step::new("json-ld", StepKind::JsonLd),
        ]);

        Ok(Self { price, title, image })
    }
}

/// Compile selector strings, skipping (and logging) the invalid ones
fn compile_selectors(selector_strings: &[String]) -> Result<Vec<(String, Selector)>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push((selector_str.clone(), selector)),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push(format!("'{}': {}", selector_str, e));
            }
        }
    }

    if selectors.is_empty() && !selector_strings.is_empty() {
        return Err(anyhow::anyhow!(
            "No valid selectors compiled from {} attempts. Errors: {}",
            selector_strings.len(),
            errors.join(", ")
        ));
    }

    Ok(selectors)
}

/// Parser for Amazon and Flipkart product pages
#[derive(Debug, Clone)]
pub struct ProductPageParser {
    amazon: RetailerCascades,
    flipkart: RetailerCascades,
}

impl ProductPageParser {
    /// Create a parser with the built-in selectors
    pub fn new() -> Result<Self> {
        Self::with_config(&SelectorConfig::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            amazon: RetailerCascades::compile(&config.amazon)?,
            flipkart: RetailerCascades::compile(&config.flipkart)?,
        })
    }

    const fn cascades(&self, retailer: Retailer) -> &RetailerCascades {
        match retailer {
            Retailer::Amazon => &self.amazon,
            Retailer::Flipkart => &self.flipkart,
        }
    }

    /// Parse raw markup fetched from `context.url`
    pub fn parse(&self, markup: &str, context: &PageContext) -> ParsingResult<ExtractionOutcome> {
        if markup.trim().is_empty() {
            return Err(ParsingError::EmptyDocument);
        }
        let html = Html::parse_document(markup);
        self.parse_with_context(&html, context)
    }

    /// Labels of the price strategies, in evaluation order
    pub fn price_strategies(&self, retailer: Retailer) -> Vec<String> {
        self.cascades(retailer)
            .price
            .iter()
            .map(|step| step.label.clone())
            .collect()
    }
}

impl ContextualParser for ProductPageParser {
    type Output = ExtractionOutcome;
    type Context = PageContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        debug!("Parsing {} product page: {}", context.retailer, context.url);

        let origin = context.origin()?;
        let page = Page::new(html, &origin);
        let cascades = self.cascades(context.retailer);

        let (price, price_source) = run_cascade(&cascades.price, Field::Price, &page).ok_or_else(|| {
            ParsingError::required_field_missing("price", self.price_strategies(context.retailer))
        })?;
        let title = run_cascade(&cascades.title, Field::Title, &page);
        let image = run_cascade(&cascades.image, Field::Image, &page);

        let sources = FieldSources {
            price: price_source.to_string(),
            title: title.as_ref().map(|(_, label)| (*label).to_string()),
            image: image.as_ref().map(|(_, label)| (*label).to_string()),
        };
        let snapshot = ProductSnapshot::new(price, title.map(|(t, _)| t), image.map(|(i, _)| i));

        debug!(
            "Extracted {} ({}) from {} [price: {}]",
            snapshot.title, snapshot.price, context.url, sources.price
        );
        Ok(ExtractionOutcome { snapshot, sources })
    }
}
