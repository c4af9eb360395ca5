//! Ordered extraction strategies
//!
//! A field (price, title, image) is resolved by walking a list of [`Step`]s
//! in order. Each step is plain data evaluated against a [`Page`]; the first
//! step that yields a validated value wins.

use once_cell::unsync::OnceCell;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::image;
use super::patterns;
use super::structured_data::{self, StructuredProduct};
use crate::domain::price::localize_price;

/// Snapshot field a cascade resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Price,
    Title,
    Image,
}

/// How a step looks for a value
#[derive(Debug, Clone)]
pub enum StepKind {
    /// Text of the first matching element that validates
    Css(Selector),
    /// schema.org `Product` in JSON-LD
    JsonLd,
    /// `itemprop="price"`
    Microdata,
    /// Price-like key/value pairs in inline scripts
    ScriptData,
    /// Currency amounts anywhere in the document text
    TextScan,
    /// `og:title`
    MetaTitle,
    /// `<title>`
    TitleTag,
    /// `<img>` candidates inside a product image container
    ImageContainer(Selector),
    /// Every `<img>` in document order
    ImageDocument,
    /// `og:image`, `image_src`, `twitter:image`
    ImageMeta,
}

/// One labelled strategy of a cascade
#[derive(Debug, Clone)]
pub struct Step {
    pub label: String,
    pub kind: StepKind,
}

impl Step {
    pub fn new(label: impl Into<String>, kind: StepKind) -> Self {
        Self {
            label: label.into(),
            kind,
        }
    }

    pub fn css(raw: &str, selector: Selector) -> Self {
        Self::new(format!("css:{raw}"), StepKind::Css(selector))
    }

    pub fn image_container(raw: &str, selector: Selector) -> Self {
        Self::new(format!("container:{raw}"), StepKind::ImageContainer(selector))
    }
}

/// Parsed document plus lazily extracted structured data
pub struct Page<'a> {
    html: &'a Html,
    origin: &'a Url,
    structured: OnceCell<Option<StructuredProduct>>,
}

impl<'a> Page<'a> {
    pub fn new(html: &'a Html, origin: &'a Url) -> Self {
        Self {
            html,
            origin,
            structured: OnceCell::new(),
        }
    }

    pub const fn html(&self) -> &'a Html {
        self.html
    }

    /// JSON-LD product, parsed at most once per page
    pub fn structured(&self) -> Option<&StructuredProduct> {
        self.structured
            .get_or_init(|| structured_data::extract_json_ld(self.html))
            .as_ref()
    }
}

/// Walk `steps` in order; returns the value and the label of the winning step
pub fn run_cascade<'s>(steps: &'s [Step], field: Field, page: &Page<'_>) -> Option<(String, &'s str)> {
    for step in steps {
        match evaluate(step, field, page) {
            Some(value) => {
                debug!("{:?} resolved by {}: {}", field, step.label, value);
                return Some((value, step.label.as_str()));
            }
            None => debug!("{:?} not found by {}", field, step.label),
        }
    }
    None
}

/// Evaluate a single step; the returned value is already validated
pub fn evaluate(step: &Step, field: Field, page: &Page<'_>) -> Option<String> {
    let html = page.html();
    match (&step.kind, field) {
        (StepKind::Css(selector), Field::Price | Field::Title) => html
            .select(selector)
            .find_map(|element| validate(field, &element_text(element))),
        (StepKind::JsonLd, Field::Price) => page.structured()?.price.clone(),
        (StepKind::JsonLd, Field::Title) => page.structured()?.name.as_deref().and_then(|n| validate(field, n)),
        (StepKind::JsonLd, Field::Image) => page
            .structured()?
            .image
            .as_deref()
            .filter(|raw| image::is_acceptable(raw))
            .and_then(|raw| image::absolutize(raw, page.origin)),
        (StepKind::Microdata, Field::Price) => structured_data::extract_microdata_price(html),
        (StepKind::ScriptData, Field::Price) => script_price(html),
        (StepKind::TextScan, Field::Price) => patterns::find_currency_amount(&document_text(html)),
        (StepKind::MetaTitle, Field::Title) => meta_title(html).and_then(|t| validate(field, &t)),
        (StepKind::TitleTag, Field::Title) => title_tag(html).and_then(|t| validate(field, &t)),
        (StepKind::ImageContainer(selector), Field::Image) => image::from_container(html, selector, page.origin),
        (StepKind::ImageDocument, Field::Image) => image::from_document(html, page.origin),
        (StepKind::ImageMeta, Field::Image) => image::from_meta(html, page.origin),
        _ => None,
    }
}

/// Field-level acceptance of a raw candidate
pub fn validate(field: Field, raw: &str) -> Option<String> {
    match field {
        Field::Price => localize_price(raw, "INR"),
        Field::Title | Field::Image => {
            let collapsed = collapse_whitespace(raw);
            (!collapsed.is_empty()).then_some(collapsed)
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

mod selectors {
    use once_cell::sync::Lazy;
    use scraper::Selector;

    pub static INLINE_SCRIPT: Lazy<Option<Selector>> =
        Lazy::new(|| Selector::parse("script:not([type='application/ld+json'])").ok());
    pub static BODY: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("body").ok());
    pub static OG_TITLE: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("meta[property='og:title']").ok());
    pub static TITLE: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("title").ok());
    pub static NON_TEXT: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("script, style, noscript").ok());
}

fn script_price(html: &Html) -> Option<String> {
    html.select(selectors::INLINE_SCRIPT.as_ref()?)
        .find_map(|script| patterns::find_script_price(&script.text().collect::<String>()))
}

/// Visible text of the body, skipping script and style content
pub fn document_text(html: &Html) -> String {
    let Some(body) = selectors::BODY.as_ref().and_then(|s| html.select(s).next()) else {
        return String::new();
    };
    let hidden: Vec<_> = selectors::NON_TEXT
        .as_ref()
        .map(|s| body.select(s).map(|el| el.id()).collect())
        .unwrap_or_default();

    body.descendants()
        .filter_map(|node| {
            let text: &str = node.value().as_text()?;
            let inside_hidden = node.ancestors().any(|a| hidden.contains(&a.id()));
            (!inside_hidden).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn meta_title(html: &Html) -> Option<String> {
    html.select(selectors::OG_TITLE.as_ref()?)
        .find_map(|el| el.value().attr("content").map(str::to_string))
}

fn title_tag(html: &Html) -> Option<String> {
    html.select(selectors::TITLE.as_ref()?).next().map(element_text)
}
