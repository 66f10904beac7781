//! Structured logging initialization
//!
//! The dispatcher, cache and profiler emit `tracing` events with structured
//! fields such as `uri`, `handler`, `status` and `latency_ms`. This module installs
//! a `tracing-subscriber` registry that renders them as JSON for production or
//! pretty-printed for development.
//!
//! ## Environment Variables
//!
//! - `DISPATCH_LOG_LEVEL`: trace/debug/info/warn/error (default: `info`)
//! - `DISPATCH_LOG_FORMAT`: `json` or `pretty` (default: `json`)
//! - `DISPATCH_LOG_LOCATION`: include file:line in output (default: `false`)
//! - `DISPATCH_LOG_TARGETS`: extra comma-separated filter directives
//!
//! `RUST_LOG`, when set, takes precedence over `DISPATCH_LOG_LEVEL`.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    /// Log format: json/pretty
    pub format: LogFormat,
    /// Module filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("DISPATCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("DISPATCH_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            target_filter: env::var("DISPATCH_LOG_TARGETS").ok(),
            include_location: env::var("DISPATCH_LOG_LOCATION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Development defaults: debug level, pretty output with locations.
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            include_location: true,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Build the filter for `config`, honouring `RUST_LOG` when present.
fn build_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));

    if let Some(target_filter) = &config.target_filter {
        for filter in target_filter.split(',') {
            let filter = filter.trim();
            if filter.is_empty() {
                continue;
            }
            match filter.parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {}", filter),
            }
        }
    }
    env_filter
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

/// Install the global subscriber using [`LogConfig::from_env`].
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LogConfig::from_env())
}
