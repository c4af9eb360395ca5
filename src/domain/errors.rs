//! Error taxonomy surfaced by the tracking use cases

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// Bad input; never retried
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Fetch failed after the retry plan was exhausted
    #[error("Network error while scraping {url}: {reason}")]
    Network { url: String, reason: String },

    /// No price could be extracted after every strategy and retry
    #[error("Could not extract product data from {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("Product is already being tracked: {url}")]
    Duplicate { url: String },

    /// Unknown id or owned by someone else
    #[error("Product not found: {id}")]
    NotFound { id: String },

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(id: &str) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// HTTP-like status a routing layer would map this error to
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Duplicate { .. } => 409,
            Self::Extraction { .. } => 422,
            Self::Network { .. } => 502,
            Self::Store(_) => 500,
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TrackerError::validation("x").status_code(), 400);
        assert_eq!(TrackerError::not_found("id").status_code(), 404);
        assert_eq!(TrackerError::Duplicate { url: "u".into() }.status_code(), 409);
    }

    #[test]
    fn test_store_error_from_anyhow() {
        let err: TrackerError = anyhow::anyhow!("disk full").into();
        assert!(err.to_string().contains("disk full"));
    }
}
