//! `price-tracker` command line
//!
//! ```text
//! price-tracker [--config <path>] scrape <url>
//! price-tracker [--config <path>] probe <url>
//! price-tracker [--config <path>] canonicalize <url>
//! ```

use anyhow::{Context, Result, anyhow, bail};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use price_tracker_lib::infrastructure::logging::{init_logging_with_config, log_system_info};
use price_tracker_lib::{AppConfig, ProductScraper, ReqwestTransport};

const USAGE: &str = "usage: price-tracker [--config <path>] <scrape|probe|canonicalize> <url>";

#[derive(Debug)]
enum Command {
    Scrape(String),
    Probe(String),
    Canonicalize(String),
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(Option<PathBuf>, Command)> {
    let mut config_path = None;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or_else(|| anyhow!("--config needs a path\n{}", USAGE))?;
                config_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" => bail!("{}", USAGE),
            _ => positional.push(arg),
        }
    }

    let [command, url] = <[String; 2]>::try_from(positional).map_err(|_| anyhow!("{}", USAGE))?;
    let command = match command.as_str() {
        "scrape" => Command::Scrape(url),
        "probe" => Command::Probe(url),
        "canonicalize" => Command::Canonicalize(url),
        other => bail!("unknown command {:?}\n{}", other, USAGE),
    };
    Ok((config_path, command))
}

fn load_config(explicit: Option<PathBuf>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => Some(path),
        None => AppConfig::default_config_path().ok().filter(|p| p.exists()),
    };
    AppConfig::load(path.as_deref())
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config_path, command) = parse_args(std::env::args().skip(1))?;
    let config = load_config(config_path)?;

    init_logging_with_config(&config.logging)?;
    log_system_info();

    let transport = Arc::new(ReqwestTransport::new(&config.scraping)?);
    let scraper = ProductScraper::new(transport, &config).context("Failed to build scraper")?;

    match command {
        Command::Scrape(url) => {
            let snapshot = scraper
                .scrape_product(&url)
                .await
                .ok_or_else(|| anyhow!("No product data could be extracted from {}", url))?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Probe(url) => match scraper.scrape_product_detailed(&url).await {
            Ok(outcome) => {
                info!(
                    "🔎 {} resolved in {} attempt(s) on {}",
                    outcome.report.canonical_url, outcome.report.attempts, outcome.report.variant
                );
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            Err(e) => {
                warn!("⚠️ Probe failed: {}", e);
                return Err(e.into());
            }
        },
        Command::Canonicalize(url) => {
            println!("{}", scraper.canonicalize(&url).await);
        }
    }

    Ok(())
}
