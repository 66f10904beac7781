//! # Runtime Configuration Module
//!
//! Settings that shape dispatch behaviour: the default content type applied to
//! root responses, whether requests are benchmarked, how long cached responses
//! live and which request headers take part in the cache fingerprint.
//!
//! ## Sources
//!
//! Configuration is loaded either from environment variables
//! ([`DispatchConfig::from_env`]) or from a TOML document
//! ([`DispatchConfig::from_toml_file`]). Missing keys fall back to defaults.
//!
//! ## Environment Variables
//!
//! | Variable | Default |
//! |---|---|
//! | `DISPATCH_CONTENT_TYPE` | `text/html` |
//! | `DISPATCH_CHARSET` | `utf-8` |
//! | `DISPATCH_PROFILING` | `false` |
//! | `DISPATCH_CACHE_LIFETIME_SECS` | `3600` |
//! | `DISPATCH_CACHE_VARY` | empty (comma-separated header names) |
//! | `DISPATCH_HANDLER_PREFIX` | `controller_` |
//!
//! ## Example
//!
//! ```toml
//! content_type = "application/json"
//! charset = "utf-8"
//! profiling = true
//! cache_lifetime_secs = 60
//! cache_vary = ["accept", "accept-language"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONTENT_TYPE: &str = "text/html";
pub const DEFAULT_CHARSET: &str = "utf-8";
pub const DEFAULT_CACHE_LIFETIME_SECS: u64 = 3600;
pub const DEFAULT_HANDLER_PREFIX: &str = "controller_";

/// Dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// MIME type applied to root responses that set no content-type
    pub content_type: String,
    /// Charset appended to the default content-type
    pub charset: String,
    /// Open a benchmark span per dispatched request
    pub profiling: bool,
    /// Lifetime of cached responses unless the response says otherwise
    pub cache_lifetime_secs: u64,
    /// Request headers folded into the cache fingerprint (lower-case)
    pub cache_vary: Vec<String>,
    /// Prefix of every handler identity
    pub handler_prefix: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            profiling: false,
            cache_lifetime_secs: DEFAULT_CACHE_LIFETIME_SECS,
            cache_vary: Vec::new(),
            handler_prefix: DEFAULT_HANDLER_PREFIX.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let content_type = env::var("DISPATCH_CONTENT_TYPE").unwrap_or(defaults.content_type);
        let charset = env::var("DISPATCH_CHARSET").unwrap_or(defaults.charset);

        let profiling = env::var("DISPATCH_PROFILING")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "on" | "yes"))
            .unwrap_or(defaults.profiling);

        let cache_lifetime_secs = env::var("DISPATCH_CACHE_LIFETIME_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cache_lifetime_secs);

        let cache_vary = env::var("DISPATCH_CACHE_VARY")
            .map(|v| parse_header_list(&v))
            .unwrap_or(defaults.cache_vary);

        let handler_prefix =
            env::var("DISPATCH_HANDLER_PREFIX").unwrap_or(defaults.handler_prefix);

        Self {
            content_type,
            charset,
            profiling,
            cache_lifetime_secs,
            cache_vary,
            handler_prefix,
        }
    }

    /// Parse configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or a key has the wrong type.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(source).context("invalid dispatch config")?;
        config.cache_vary = config
            .cache_vary
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&source)
    }

    /// Value of the content-type header applied to root responses.
    #[must_use]
    pub fn default_content_type(&self) -> String {
        format!("{}; charset={}", self.content_type, self.charset)
    }

    #[must_use]
    pub fn cache_lifetime(&self) -> Duration {
        Duration::from_secs(self.cache_lifetime_secs)
    }
}

fn parse_header_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.default_content_type(), "text/html; charset=utf-8");
        assert_eq!(config.cache_lifetime(), Duration::from_secs(3600));
        assert!(!config.profiling);
        assert_eq!(config.handler_prefix, "controller_");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DispatchConfig::from_toml_str(
            "charset = \"iso-8859-1\"\ncache_vary = [\" Accept \", \"\"]\n",
        )
        .unwrap();
        assert_eq!(config.charset, "iso-8859-1");
        assert_eq!(config.content_type, "text/html");
        assert_eq!(config.cache_vary, vec!["accept".to_string()]);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(DispatchConfig::from_toml_str("profiling = \"maybe\"").is_err());
    }

    #[test]
    fn test_header_list() {
        assert_eq!(
            parse_header_list("Accept, ,X-Locale"),
            vec!["accept".to_string(), "x-locale".to_string()]
        );
    }
}
