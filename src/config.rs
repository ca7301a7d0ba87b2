//! Runtime configuration.
//!
//! All settings have defaults that match the production alert feed, so the
//! binary runs with no configuration at all. A YAML file can override any
//! subset of fields:
//!
//! ```yaml
//! feed_url: https://www.google.com/alerts/feeds/123/456
//! workers: 10
//! cache_ttl_secs: 900
//! fetch_timeout_secs: 2
//! excerpt_length: 160
//! placeholder_image: https://placehold.co/600x400?text=News
//! ```
//!
//! Command-line flags (see [`crate::cli::Cli`]) are applied on top of the file.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_FEED_URL: &str =
    "https://www.google.com/alerts/feeds/16780431236428968089/13199558778761765910";
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 900;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_EXCERPT_LENGTH: usize = 160;
pub const DEFAULT_EXCERPT_SUFFIX: &str = "...";
pub const DEFAULT_PLACEHOLDER_IMAGE: &str =
    "https://placehold.co/600x400/E30613/FFFFFF?text=PSOE+News";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_SUMMARY_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Alert feed to aggregate.
    pub feed_url: String,
    /// Maximum number of entries enriched concurrently.
    pub workers: usize,
    /// How long an aggregated post list is served from cache.
    pub cache_ttl_secs: u64,
    /// Per-request timeout for destination pages.
    pub fetch_timeout_secs: u64,
    /// Timeout for the feed request.
    pub feed_timeout_secs: u64,
    /// Excerpt length in characters, before the suffix.
    pub excerpt_length: usize,
    pub excerpt_suffix: String,
    /// Image used when a page has no `og:image`.
    pub placeholder_image: String,
    pub user_agent: String,
    /// Number of posts in the summary view.
    pub summary_count: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            workers: DEFAULT_WORKERS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            feed_timeout_secs: DEFAULT_FEED_TIMEOUT_SECS,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            excerpt_suffix: DEFAULT_EXCERPT_SUFFIX.to_string(),
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            summary_count: DEFAULT_SUMMARY_COUNT,
        }
    }
}

impl NewsConfig {
    /// Load configuration from an optional YAML file.
    ///
    /// `None` yields [`NewsConfig::default`]. Fields missing from the file keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is not valid YAML
    /// for this structure.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })?;
        info!(config_path = path, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to `null`, which should mean "all defaults".
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    /// Worker count, never below one.
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NewsConfig::default();
        assert_eq!(config.workers, 10);
        assert_eq!(config.cache_ttl(), Duration::from_secs(900));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(2));
        assert_eq!(config.excerpt_length, 160);
        assert_eq!(config.excerpt_suffix, "...");
        assert_eq!(config.summary_count, 6);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = NewsConfig::from_yaml("workers: 4\nfeed_url: https://feeds.example/a\n").unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.feed_url, "https://feeds.example/a");
        assert_eq!(config.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS);
        assert_eq!(config.placeholder_image, DEFAULT_PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(NewsConfig::from_yaml("  \n").unwrap(), NewsConfig::default());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(NewsConfig::from_yaml("workers: [not, a, number]").is_err());
    }

    #[test]
    fn test_load_none_and_missing_file() {
        assert_eq!(NewsConfig::load(None).unwrap(), NewsConfig::default());
        let err = NewsConfig::load(Some("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_worker_count_floor() {
        let config = NewsConfig {
            workers: 0,
            ..NewsConfig::default()
        };
        assert_eq!(config.worker_count(), 1);
    }
}
