//! Parsing context for product page extraction

use url::Url;

use super::{ParsingError, ParsingResult};
use crate::domain::Retailer;

/// Context information for parsing one product page
#[derive(Debug, Clone)]
pub struct PageContext {
    /// URL the markup was fetched from
    pub url: String,

    /// Retailer whose selectors apply
    pub retailer: Retailer,
}

impl PageContext {
    pub fn new(url: impl Into<String>, retailer: Retailer) -> Self {
        Self {
            url: url.into(),
            retailer,
        }
    }

    /// Classify `url` and build the context; unsupported hosts are rejected
    pub fn for_url(url: &str) -> ParsingResult<Self> {
        let retailer = Retailer::classify(url).ok_or_else(|| ParsingError::UnsupportedRetailer {
            url: url.to_string(),
        })?;
        Ok(Self::new(url, retailer))
    }

    /// Base for resolving relative links: the retailer's canonical origin
    pub fn origin(&self) -> ParsingResult<Url> {
        Url::parse(self.retailer.origin()).map_err(|_| ParsingError::UnsupportedRetailer {
            url: self.url.clone(),
        })
    }
}
