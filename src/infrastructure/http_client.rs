//! HTTP transport for product page fetching
//!
//! `HtmlTransport` is the seam between the scraping pipeline and the network.
//! `ReqwestTransport` is the production implementation; tests substitute a
//! scripted transport.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::infrastructure::config::ScrapingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMethod {
    Get,
    Head,
}

/// A single outbound request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: FetchMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub follow_redirects: bool,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: FetchMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            timeout,
            follow_redirects: true,
        }
    }

    pub fn head(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: FetchMethod::Head,
            follow_redirects: false,
            ..Self::get(url, timeout)
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }
}

/// Response of any HTTP status; transport failures are `FetchError`s
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    /// Effective URL after redirects
    pub final_url: String,
    /// Header names lower-cased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl FetchResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub const fn is_redirect(&self) -> bool {
        matches!(self.status, 300..=399)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// Classify non-success statuses into `FetchError`s
    pub fn into_success(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::from_status(&self.final_url, self.status))
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Could not reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Access denied (403) for {url}")]
    AccessDenied { url: String },

    #[error("Page not found (404): {url}")]
    NotFound { url: String },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("HTTP error {status}: {url}")]
    HttpStatus { url: String, status: u16 },
}

impl FetchError {
    pub fn from_status(url: &str, status: u16) -> Self {
        let url = url.to_string();
        match status {
            403 => Self::AccessDenied { url },
            404 => Self::NotFound { url },
            408 => Self::Timeout { url },
            _ => Self::HttpStatus { url, status },
        }
    }

    /// Whether the next attempt of the retry plan should run
    pub const fn is_escalatable(&self) -> bool {
        match self {
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::AccessDenied { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound { .. } => false,
        }
    }
}

/// Outbound HTML transport
#[async_trait]
pub trait HtmlTransport: Send + Sync {
    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// `reqwest` transport with one client per redirect policy
#[derive(Clone)]
pub struct ReqwestTransport {
    following: Client,
    direct: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ScrapingConfig) -> anyhow::Result<Self> {
        let following = Self::builder(config)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        let direct = Self::builder(config)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!(
            "🌐 HTTP transport ready (timeout: {}s, max redirects: {})",
            config.request_timeout_seconds, config.max_redirects
        );
        Ok(Self { following, direct })
    }

    fn builder(config: &ScrapingConfig) -> ClientBuilder {
        ClientBuilder::new()
            .timeout(config.request_timeout())
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
    }

    fn classify(url: &str, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Unreachable {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl HtmlTransport for ReqwestTransport {
    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let client = if request.follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        let mut builder = match request.method {
            FetchMethod::Get => client.get(&request.url),
            FetchMethod::Head => client.head(&request.url),
        }
        .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!("HTTP {:?} {}", request.method, request.url);
        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify(&request.url, &e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = if request.method == FetchMethod::Head || status == StatusCode::NO_CONTENT {
            String::new()
        } else {
            response
                .text()
                .await
                .map_err(|e| Self::classify(&request.url, &e))?
        };

        debug!("HTTP {} {} ({} bytes)", status.as_u16(), final_url, body.len());
        Ok(FetchResponse {
            status: status.as_u16(),
            final_url,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(403, true)]
    #[case(404, false)]
    #[case(408, true)]
    #[case(429, true)]
    #[case(500, true)]
    #[case(503, true)]
    #[case(410, false)]
    #[case(400, false)]
    fn test_status_escalation(#[case] status: u16, #[case] escalatable: bool) {
        assert_eq!(FetchError::from_status("https://www.amazon.in/dp/X", status).is_escalatable(), escalatable);
    }

    #[test]
    fn test_network_failures_escalate() {
        let unreachable = FetchError::Unreachable {
            url: "u".into(),
            reason: "dns".into(),
        };
        assert!(unreachable.is_escalatable());
        assert!(FetchError::Timeout { url: "u".into() }.is_escalatable());
    }

    #[test]
    fn test_into_success() {
        let ok = FetchResponse {
            status: 200,
            ..Default::default()
        };
        assert!(ok.into_success().is_ok());

        let denied = FetchResponse {
            status: 403,
            final_url: "https://www.flipkart.com/p".into(),
            ..Default::default()
        };
        assert!(matches!(denied.into_success(), Err(FetchError::AccessDenied { .. })));
    }

    #[test]
    fn test_head_request_defaults() {
        let request = FetchRequest::head("https://amzn.to/x", Duration::from_secs(5));
        assert_eq!(request.method, FetchMethod::Head);
        assert!(!request.follow_redirects);
        assert!(FetchRequest::get("https://amzn.to/x", Duration::from_secs(5)).follow_redirects);
    }

    #[test]
    fn test_transport_builds_from_defaults() {
        assert!(ReqwestTransport::new(&ScrapingConfig::default()).is_ok());
    }
}
