//! Logging system configuration and initialization
//!
//! This module provides the logging setup used by the binary:
//! - Console and/or daily-rotated file output
//! - Configuration based log level control, overridable with `RUST_LOG`
//! - Structured JSON logging (optional)
//! - IST (India Standard Time) timestamps

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::{FixedOffset, Utc};
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    Layer,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

/// Base name of the rolling log file
const LOG_FILE_PREFIX: &str = "price-tracker.log";

/// IST offset, UTC+05:30
const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

// Keeps the non-blocking file writers alive for the life of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());
}

/// Time formatter for IST
struct IstTimeFormatter;

impl FormatTime for IstTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Utc::now();
        match FixedOffset::east_opt(IST_OFFSET_SECONDS) {
            Some(ist) => write!(w, "{}", now.with_timezone(&ist).format("%Y-%m-%d %H:%M:%S%.3f %:z")),
            None => write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f UTC")),
        }
    }
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level plus
/// per-module overrides.
///
/// ```bash
/// # Show HTTP client internals too
/// RUST_LOG="debug,reqwest=debug,hyper=debug" price-tracker scrape <url>
/// ```
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level {:?}: {}", config.level, e))?;

    // Dependencies stay quiet unless TRACE is requested
    if !config.level.to_lowercase().contains("trace") {
        let mut modules: Vec<_> = config.module_filters.iter().collect();
        modules.sort();
        for (module, level) in modules {
            let directive = format!("{}={}", module, level)
                .parse()
                .map_err(|e| anyhow!("Invalid log filter {}={}: {}", module, level, e))?;
            filter = filter.add_directive(directive);
        }
    }

    let own = format!("price_tracker_lib={}", config.level)
        .parse()
        .map_err(|e| anyhow!("Invalid log level {:?}: {}", config.level, e))?;
    Ok(filter.add_directive(own))
}

fn keep_guard(guard: WorkerGuard) -> Result<()> {
    LOG_GUARDS
        .lock()
        .map_err(|_| anyhow!("Log guard registry poisoned"))?
        .push(guard);
    Ok(())
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;
    let registry = Registry::default().with(env_filter);

    let log_dir = config.log_dir.clone().unwrap_or_else(get_log_directory);

    match (config.file_output, config.console_output) {
        (false, false) => return Err(anyhow!("No logging output configured")),
        (false, true) => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(IstTimeFormatter)
                .with_target(false);
            registry
                .with(console_layer)
                .try_init()
                .map_err(|e| anyhow!("Failed to install subscriber: {}", e))?;
        }
        (true, console) => {
            std::fs::create_dir_all(&log_dir)
                .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
            let (file_writer, file_guard) = non_blocking(rolling::daily(&log_dir, LOG_FILE_PREFIX));
            keep_guard(file_guard)?;

            // Layers are boxed so the JSON and plain variants share one registry type
            let file_layer = if config.json_format {
                fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(IstTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .boxed()
            } else {
                fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(IstTimeFormatter)
                    .with_target(false)
                    .with_ansi(false)
                    .boxed()
            };
            let console_layer = console.then(|| {
                fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(IstTimeFormatter)
                    .with_target(false)
            });

            registry
                .with(file_layer)
                .with(console_layer)
                .try_init()
                .map_err(|e| anyhow!("Failed to install subscriber: {}", e))?;
        }
    }

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    info!("JSON format: {}", config.json_format);
    info!("Console output: {}", config.console_output);
    if config.file_output {
        info!("Log directory: {:?}", log_dir);
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== Price Tracker System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
    info!("========================================");
}
