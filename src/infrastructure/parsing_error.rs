//! Parsing error types for product page extraction
//!
//! Detailed error types for the extraction cascade, with the recovery
//! classification the scrape retry plan relies on.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        /// Strategy labels tried in order
        attempted_strategies: Vec<String>,
    },

    #[error("Unsupported retailer for URL: {url}")]
    UnsupportedRetailer { url: String },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Empty document")]
    EmptyDocument,
}

impl ParsingError {
    /// Create a required field missing error with the strategies tried
    pub fn required_field_missing(field: &str, attempted_strategies: Vec<String>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            attempted_strategies,
        }
    }

    /// Whether another fetch attempt (other site variant or identity) may succeed
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::RequiredFieldMissing { .. } | Self::EmptyDocument => true,
            Self::UnsupportedRetailer { .. } | Self::InvalidSelector { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
