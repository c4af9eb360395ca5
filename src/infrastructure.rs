//! Infrastructure layer for fetching, parsing, configuration and storage
//!
//! This module provides the HTTP transport, the fetch/retry strategy, URL
//! canonicalization, HTML extraction, in-memory stores and the logging setup.

pub mod block_detector; // Bot-challenge page detection
pub mod config; // Layered configuration and defaults
pub mod fetch_strategy; // Browser identities, retry plan and pacing
pub mod http_client; // Transport seam and reqwest implementation
pub mod logging; // Logging infrastructure
pub mod memory_store; // In-memory repositories and push sink
pub mod parsing; // Field extraction cascades
pub mod parsing_error; // Extraction error types
pub mod product_scraper; // Scrape orchestration
pub mod url_canonicalizer; // Tracking-parameter stripping and short-link resolution

// Re-export commonly used items
pub use block_detector::is_block_page;
pub use config::{AppConfig, LoggingConfig, ScrapingConfig, TrackingConfig};
pub use fetch_strategy::{Attempt, BrowserIdentity, DelayPolicy, PageFetcher, RetryPlan};
pub use http_client::{FetchError, FetchMethod, FetchRequest, FetchResponse, HtmlTransport, ReqwestTransport};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use memory_store::{InMemoryDeviceTokenStore, InMemoryProductStore, LoggingNotificationSink};
pub use parsing::{ExtractionOutcome, PageContext, ParsingError, ParsingResult, ProductPageParser, SelectorConfig};
pub use product_scraper::{ProductScraper, ScrapeError, ScrapeOutcome, ScrapeReport};
pub use url_canonicalizer::{UrlResolver, normalize_url};
