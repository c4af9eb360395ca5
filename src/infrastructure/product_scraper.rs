//! Product scraping pipeline
//!
//! canonicalize → classify → for each planned attempt: fetch → block check →
//! extract. The whole pipeline runs under one timeout.

use anyhow::Result;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{ProductSnapshot, Retailer, SiteVariant, TrackerError};
use crate::infrastructure::block_detector::block_signature;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::fetch_strategy::{PageFetcher, RetryPlan};
use crate::infrastructure::http_client::{FetchError, HtmlTransport};
use crate::infrastructure::parsing::{FieldSources, PageContext, ParsingError, ProductPageParser};
use crate::infrastructure::url_canonicalizer::UrlResolver;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Unsupported retailer URL: {url}")]
    Unsupported { url: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ParsingError),

    #[error("Scrape timed out after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },
}

impl ScrapeError {
    /// Public error for a failed scrape of `url`
    pub fn into_tracker_error(self, url: &str) -> TrackerError {
        let url = url.to_string();
        match self {
            Self::Unsupported { .. } => {
                TrackerError::validation("Only Amazon and Flipkart product URLs are supported")
            }
            Self::Fetch(e) => TrackerError::Network {
                url,
                reason: e.to_string(),
            },
            Self::Timeout { seconds, .. } => TrackerError::Network {
                url,
                reason: format!("timed out after {seconds}s"),
            },
            Self::Extraction(e) => TrackerError::Extraction {
                url,
                reason: e.to_string(),
            },
        }
    }
}

/// How a successful scrape was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeReport {
    pub canonical_url: String,
    pub retailer: Retailer,
    /// Fetch attempts used, including the successful one
    pub attempts: u32,
    /// Site variant of the successful attempt
    pub variant: SiteVariant,
    /// Attempts that returned a bot-challenge page
    pub blocked_attempts: u32,
    pub sources: FieldSources,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeOutcome {
    pub snapshot: ProductSnapshot,
    pub report: ScrapeReport,
}

/// Scrapes Amazon and Flipkart product pages
#[derive(Clone)]
pub struct ProductScraper {
    resolver: UrlResolver,
    fetcher: PageFetcher,
    parser: Arc<ProductPageParser>,
    max_retries: u32,
    scrape_timeout: Duration,
}

impl ProductScraper {
    pub fn new(transport: Arc<dyn HtmlTransport>, config: &AppConfig) -> Result<Self> {
        let scraping = &config.scraping;
        Ok(Self {
            resolver: UrlResolver::new(
                Arc::clone(&transport),
                scraping.max_redirects,
                scraping.request_timeout(),
            ),
            fetcher: PageFetcher::new(transport, scraping),
            parser: Arc::new(ProductPageParser::with_config(&config.selectors)?),
            max_retries: scraping.max_retries,
            scrape_timeout: scraping.scrape_timeout(),
        })
    }

    /// Canonical form of a product URL (short links resolved, tracking removed)
    pub async fn canonicalize(&self, url: &str) -> String {
        self.resolver.canonicalize(url).await
    }

    /// Scrape `url`; failures are logged and surface as `None`
    pub async fn scrape_product(&self, url: &str) -> Option<ProductSnapshot> {
        match self.scrape_product_detailed(url).await {
            Ok(outcome) => Some(outcome.snapshot),
            Err(e) => {
                error!("❌ Scrape failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Scrape `url` returning the strategy report or the typed failure
    pub async fn scrape_product_detailed(&self, url: &str) -> Result<ScrapeOutcome, ScrapeError> {
        self.bounded(url, async {
            let canonical = self.resolver.canonicalize(url).await;
            self.run_attempts(&canonical).await
        })
        .await
    }

    /// Scrape a URL that is already canonical
    pub async fn scrape_canonical(&self, canonical_url: &str) -> Result<ScrapeOutcome, ScrapeError> {
        self.bounded(canonical_url, self.run_attempts(canonical_url)).await
    }

    async fn bounded<F>(&self, url: &str, pipeline: F) -> Result<ScrapeOutcome, ScrapeError>
    where
        F: Future<Output = Result<ScrapeOutcome, ScrapeError>>,
    {
        match tokio::time::timeout(self.scrape_timeout, pipeline).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Timeout {
                url: url.to_string(),
                seconds: self.scrape_timeout.as_secs(),
            }),
        }
    }

    async fn run_attempts(&self, canonical: &str) -> Result<ScrapeOutcome, ScrapeError> {
        let retailer = Retailer::classify(canonical).ok_or_else(|| ScrapeError::Unsupported {
            url: canonical.to_string(),
        })?;
        let plan = RetryPlan::for_retailer(retailer, self.max_retries);
        let context = PageContext::new(canonical, retailer);

        let mut blocked_attempts = 0;
        let mut last_error = None;

        for attempt in plan.attempts() {
            let response = match self.fetcher.fetch(canonical, retailer, attempt).await {
                Ok(response) => response,
                Err(e) if e.is_escalatable() && !attempt.is_last => {
                    warn!("⚠️ Attempt {} failed for {}: {}; escalating", attempt.index, canonical, e);
                    last_error = Some(ScrapeError::Fetch(e));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(signature) = block_signature(&response.body) {
                blocked_attempts += 1;
                if !attempt.is_last {
                    warn!(
                        "🛑 Bot challenge on attempt {} for {} ({}); escalating",
                        attempt.index, canonical, signature
                    );
                    continue;
                }
                warn!("🛑 Still blocked on the last attempt for {}; extracting anyway", canonical);
            }

            match self.parser.parse(&response.body, &context) {
                Ok(extraction) => {
                    info!(
                        "✅ Scraped {} on attempt {} ({}): {}",
                        canonical, attempt.index, attempt.variant, extraction.snapshot.price
                    );
                    return Ok(ScrapeOutcome {
                        snapshot: extraction.snapshot,
                        report: ScrapeReport {
                            canonical_url: canonical.to_string(),
                            retailer,
                            attempts: attempt.index + 1,
                            variant: attempt.variant,
                            blocked_attempts,
                            sources: extraction.sources,
                        },
                    });
                }
                Err(e) if e.is_recoverable() && !attempt.is_last => {
                    warn!("⚠️ Extraction failed on attempt {} for {}: {}", attempt.index, canonical, e);
                    last_error = Some(ScrapeError::Extraction(e));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ScrapeError::Fetch(FetchError::Unreachable {
                url: canonical.to_string(),
                reason: "no fetch attempt was planned".to_string(),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ScrapingConfig;
    use crate::infrastructure::http_client::{FetchRequest, FetchResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays queued results and records requested URLs
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<FetchResponse, FetchError>>>,
        requested: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<FetchResponse, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HtmlTransport for ScriptedTransport {
        async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            self.requested.lock().unwrap().push(request.url.clone());
            self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(FetchError::Unreachable {
                    url: request.url.clone(),
                    reason: "script exhausted".into(),
                })
            })
        }
    }

    /// Never answers within the scrape timeout
    struct StalledTransport;

    #[async_trait]
    impl HtmlTransport for StalledTransport {
        async fn send(&self, _request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(FetchResponse::default())
        }
    }

    fn page(body: &str) -> Result<FetchResponse, FetchError> {
        Ok(FetchResponse {
            status: 200,
            body: body.to_string(),
            ..Default::default()
        })
    }

    fn status(code: u16) -> Result<FetchResponse, FetchError> {
        Ok(FetchResponse {
            status: code,
            ..Default::default()
        })
    }

    const AMAZON_PAGE: &str = r#"<html><body><span id="productTitle">Kindle Paperwhite</span>
        <div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">₹13,999</span></span></div></body></html>"#;
    const FLIPKART_PAGE: &str = r#"<html><body><span class="VU-ZEz">Steel Bottle</span>
        <div class="Nx9bqj CxhGGd">₹749</div></body></html>"#;
    const CAPTCHA_PAGE: &str = r#"<html><body><form action="/errors/validateCaptcha"></form></body></html>"#;

    fn scraper(transport: Arc<dyn HtmlTransport>) -> ProductScraper {
        let config = AppConfig {
            scraping: ScrapingConfig::without_delays(),
            ..AppConfig::default()
        };
        ProductScraper::new(transport, &config).unwrap()
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let transport = ScriptedTransport::new(vec![page(AMAZON_PAGE)]);
        let outcome = scraper(transport.clone())
            .scrape_product_detailed("https://www.amazon.in/dp/B0TEST/ref=sr_1_1?tag=x-21")
            .await
            .unwrap();

        assert_eq!(outcome.snapshot.price, "₹13,999");
        assert_eq!(outcome.snapshot.title, "Kindle Paperwhite");
        assert_eq!(outcome.report.canonical_url, "https://www.amazon.in/dp/B0TEST");
        assert_eq!(outcome.report.attempts, 1);
        assert_eq!(transport.requested(), vec!["https://www.amazon.in/dp/B0TEST".to_string()]);
    }

    #[tokio::test]
    async fn test_flipkart_escalates_from_mobile_to_desktop() {
        let transport = ScriptedTransport::new(vec![status(403), page(FLIPKART_PAGE)]);
        let outcome = scraper(transport.clone())
            .scrape_product_detailed("https://www.flipkart.com/steel-bottle/p/itm42?pid=BTL")
            .await
            .unwrap();

        assert_eq!(outcome.report.attempts, 2);
        assert_eq!(outcome.report.variant, SiteVariant::Desktop);
        assert_eq!(
            transport.requested(),
            vec![
                "https://dl.flipkart.com/dl/steel-bottle/p/itm42?pid=BTL".to_string(),
                "https://www.flipkart.com/steel-bottle/p/itm42?pid=BTL".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_block_page_triggers_retry() {
        let transport = ScriptedTransport::new(vec![page(CAPTCHA_PAGE), page(AMAZON_PAGE)]);
        let outcome = scraper(transport)
            .scrape_product_detailed("https://www.amazon.in/dp/B0TEST")
            .await
            .unwrap();
        assert_eq!(outcome.report.blocked_attempts, 1);
        assert_eq!(outcome.report.attempts, 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let transport = ScriptedTransport::new(vec![status(404), page(AMAZON_PAGE)]);
        let result = scraper(transport.clone())
            .scrape_product_detailed("https://www.amazon.in/dp/B0GONE")
            .await;
        assert!(matches!(result, Err(ScrapeError::Fetch(FetchError::NotFound { .. }))));
        assert_eq!(transport.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_plan_reports_last_failure() {
        let transport = ScriptedTransport::new(vec![status(503), page(CAPTCHA_PAGE), page(CAPTCHA_PAGE)]);
        let result = scraper(transport.clone())
            .scrape_product_detailed("https://www.amazon.in/dp/B0TEST")
            .await;
        assert!(matches!(
            result,
            Err(ScrapeError::Extraction(ParsingError::RequiredFieldMissing { .. }))
        ));
        assert_eq!(transport.requested().len(), 3);
    }

    #[tokio::test]
    async fn test_blocked_last_attempt_still_extracts() {
        const PRICED_CAPTCHA_PAGE: &str = r#"<html><body>
            <form action="/errors/validateCaptcha"><input id="captchacharacters"></form>
            <span id="productTitle">Kindle Paperwhite</span>
            <div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">₹13,999</span></span></div>
        </body></html>"#;
        let plan_len = RetryPlan::for_retailer(Retailer::Amazon, ScrapingConfig::without_delays().max_retries).len();
        let replies = (0..plan_len).map(|_| page(PRICED_CAPTCHA_PAGE)).collect();
        let transport = ScriptedTransport::new(replies);

        let outcome = scraper(transport.clone())
            .scrape_product_detailed("https://www.amazon.in/dp/B0TEST")
            .await
            .unwrap();
        assert_eq!(outcome.snapshot.price, "₹13,999");
        assert_eq!(outcome.report.blocked_attempts as usize, plan_len);
        assert_eq!(outcome.report.attempts as usize, plan_len);
        assert_eq!(transport.requested().len(), plan_len);
    }

    #[tokio::test]
    async fn test_unsupported_url_skips_network() {
        let transport = ScriptedTransport::new(vec![]);
        let scraper = scraper(transport.clone());
        let result = scraper.scrape_product_detailed("https://shop.example.com/item/1").await;
        assert!(matches!(result, Err(ScrapeError::Unsupported { .. })));
        assert!(scraper.scrape_product("https://shop.example.com/item/1").await.is_none());
        assert!(transport.requested().is_empty());
    }

    #[tokio::test]
    async fn test_scrape_is_bounded_by_timeout() {
        let config = AppConfig {
            scraping: ScrapingConfig {
                scrape_timeout_seconds: 1,
                ..ScrapingConfig::without_delays()
            },
            ..AppConfig::default()
        };
        let scraper = ProductScraper::new(Arc::new(StalledTransport), &config).unwrap();
        let result = scraper.scrape_product_detailed("https://www.amazon.in/dp/B0SLOW").await;
        assert!(matches!(result, Err(ScrapeError::Timeout { seconds: 1, .. })));
    }

    #[test]
    fn test_error_mapping() {
        let url = "https://www.amazon.in/dp/X";
        assert_eq!(
            ScrapeError::Unsupported { url: url.into() }.into_tracker_error(url).status_code(),
            400
        );
        assert_eq!(
            ScrapeError::Fetch(FetchError::AccessDenied { url: url.into() })
                .into_tracker_error(url)
                .status_code(),
            502
        );
        assert_eq!(
            ScrapeError::Extraction(ParsingError::EmptyDocument)
                .into_tracker_error(url)
                .status_code(),
            422
        );
    }
}
