//! Configuration infrastructure
//!
//! Contains configuration loading for scraping, tracking and logging.
//!
//! Configuration is layered:
//! 1. Built-in defaults (the `defaults` module)
//! 2. An optional config file (TOML/JSON/YAML, picked by extension)
//! 3. `PRICE_TRACKER__*` environment variables (`__` separates sections)

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::infrastructure::parsing::config::SelectorConfig;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PRICE_TRACKER";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraping: ScrapingConfig,
    pub tracking: TrackingConfig,
    pub logging: LoggingConfig,
    pub selectors: SelectorConfig,
}

/// Outbound fetch and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Timeout of a single HTTP request in seconds
    pub request_timeout_seconds: u64,

    /// Upper bound for a whole `scrape_product` call in seconds
    pub scrape_timeout_seconds: u64,

    /// Escalation retries after the first attempt
    pub max_retries: u32,

    /// Randomized delay range before the first attempt
    pub initial_delay_min_ms: u64,
    pub initial_delay_max_ms: u64,

    /// Base of the exponential backoff between attempts
    pub retry_backoff_base_ms: u64,

    /// Redirect hops followed when resolving short links
    pub max_redirects: usize,
}

/// Refresh and batch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Delay between products during a batch check
    pub batch_item_delay_ms: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for log files; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            scrape_timeout_seconds: defaults::SCRAPE_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            initial_delay_min_ms: defaults::INITIAL_DELAY_MIN_MS,
            initial_delay_max_ms: defaults::INITIAL_DELAY_MAX_MS,
            retry_backoff_base_ms: defaults::RETRY_BACKOFF_BASE_MS,
            max_redirects: defaults::MAX_REDIRECTS,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            batch_item_delay_ms: defaults::BATCH_ITEM_DELAY_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

impl ScrapingConfig {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub const fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_seconds)
    }

    /// Configuration without any artificial delay, for tests and one-off probes
    pub fn without_delays() -> Self {
        Self {
            initial_delay_min_ms: 0,
            initial_delay_max_ms: 0,
            retry_backoff_base_ms: 0,
            ..Self::default()
        }
    }
}

impl AppConfig {
    /// Default location of the config file
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("price-tracker");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration layering `path` (optional) and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;

        if let Some(path) = path {
            info!("Loaded configuration (file: {:?})", path);
        }
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let scraping = &self.scraping;

        if scraping.request_timeout_seconds == 0 {
            return Err(anyhow!("scraping.request_timeout_seconds must be greater than 0"));
        }
        if scraping.scrape_timeout_seconds == 0 {
            return Err(anyhow!("scraping.scrape_timeout_seconds must be greater than 0"));
        }
        if scraping.initial_delay_min_ms > scraping.initial_delay_max_ms {
            return Err(anyhow!(
                "scraping.initial_delay_min_ms ({}) cannot be greater than initial_delay_max_ms ({})",
                scraping.initial_delay_min_ms,
                scraping.initial_delay_max_ms
            ));
        }
        if self.selectors.amazon.price.is_empty() || self.selectors.flipkart.price.is_empty() {
            return Err(anyhow!("selectors must define at least one price selector per retailer"));
        }
        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 20;

    /// Default bound for a whole scrape (all attempts) in seconds
    pub const SCRAPE_TIMEOUT_SECONDS: u64 = 60;

    /// Default escalation retries after the first attempt
    pub const MAX_RETRIES: u32 = 2;

    /// Default jitter range before the first attempt
    pub const INITIAL_DELAY_MIN_MS: u64 = 500;
    pub const INITIAL_DELAY_MAX_MS: u64 = 2000;

    /// Default backoff base between attempts
    pub const RETRY_BACKOFF_BASE_MS: u64 = 1000;

    /// Default redirect hops when resolving short links
    pub const MAX_REDIRECTS: usize = 5;

    /// Default delay between products in a batch check
    pub const BATCH_ITEM_DELAY_MS: u64 = 3000;

    // Log configuration defaults
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = false;
}
