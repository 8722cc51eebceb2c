//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Discogs API access settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Snapshot store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Work queue settings
    #[serde(default)]
    pub queue: QueueConfig,

    /// Crawl loop behavior
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Rate limit handling
    #[serde(default)]
    pub rate: RateConfig,

    /// Shard range and naming
    #[serde(default)]
    pub shards: ShardConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.api.base_url)
            .map_err(|e| AppError::config(format!("api.base_url is not a valid URL: {e}")))?;
        if self.api.timeout_secs == 0 {
            return Err(AppError::config("api.timeout_secs must be > 0"));
        }
        if self.queue.url.trim().is_empty() {
            return Err(AppError::config("queue.url is empty"));
        }
        if self.crawl.max_fetch_attempts == 0 {
            return Err(AppError::config("crawl.max_fetch_attempts must be > 0"));
        }
        if self.rate.floor_secs == 0 {
            return Err(AppError::config("rate.floor_secs must be > 0"));
        }
        if self.rate.ceiling_secs < self.rate.floor_secs {
            return Err(AppError::config(
                "rate.ceiling_secs must be >= rate.floor_secs",
            ));
        }
        if self.rate.initial_remaining == 0 {
            return Err(AppError::config("rate.initial_remaining must be > 0"));
        }
        if self.shards.width == 0 {
            return Err(AppError::config("shards.width must be > 0"));
        }
        if self.shards.min == 0 || self.shards.max < self.shards.min {
            return Err(AppError::config("shards.min..max must be a 1-based range"));
        }
        crate::normalize::parse_removals(&self.crawl.remove_fields)?;
        Ok(())
    }

    /// Validate the fields the crawl loop cannot start without.
    ///
    /// These are mandatory at startup; a missing one is a fatal error before
    /// any work item is popped.
    pub fn validate_for_crawl(&self) -> Result<()> {
        if self.api.user.trim().is_empty() {
            return Err(AppError::config("api.user is required for crawling"));
        }
        if self.api.token.trim().is_empty() {
            return Err(AppError::config("api.token is required for crawling"));
        }
        if self.store.root.trim().is_empty() {
            return Err(AppError::config("store.root is required for crawling"));
        }
        Ok(())
    }
}

/// Discogs API access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the catalog API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Discogs username, used in the User-Agent header
    #[serde(default)]
    pub user: String,

    /// Personal access token
    #[serde(default)]
    pub token: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user: String::new(),
            token: String::new(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Snapshot store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding the per-shard partitions
    #[serde(default)]
    pub root: String,

    /// Commit author name
    #[serde(default = "defaults::author_name")]
    pub author_name: String,

    /// Commit author email
    #[serde(default = "defaults::author_email")]
    pub author_email: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            author_name: defaults::author_name(),
            author_email: defaults::author_email(),
        }
    }
}

/// Work queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Redis connection URL
    #[serde(default = "defaults::queue_url")]
    pub url: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: defaults::queue_url(),
        }
    }
}

/// Crawl loop behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Fields to remove before persistence (`key` or `key/subkey`)
    #[serde(default)]
    pub remove_fields: Vec<String>,

    /// Strip thumbnail URLs from nested collections
    #[serde(default = "defaults::strip_thumbnails")]
    pub strip_thumbnails: bool,

    /// Attempts per item before a transport failure becomes item-terminal
    #[serde(default = "defaults::max_fetch_attempts")]
    pub max_fetch_attempts: u32,

    /// Base delay between transport retries, in milliseconds
    #[serde(default = "defaults::retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            remove_fields: Vec::new(),
            strip_thumbnails: defaults::strip_thumbnails(),
            max_fetch_attempts: defaults::max_fetch_attempts(),
            retry_backoff_ms: defaults::retry_backoff_ms(),
        }
    }
}

/// Rate limit handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    /// Minimum adaptive backoff in seconds
    #[serde(default = "defaults::floor")]
    pub floor_secs: u64,

    /// Maximum adaptive backoff in seconds
    #[serde(default = "defaults::ceiling")]
    pub ceiling_secs: u64,

    /// Sleep when throttled without a Retry-After header, in seconds
    #[serde(default = "defaults::default_wait")]
    pub default_wait_secs: u64,

    /// Assumed remaining budget before the first response arrives
    #[serde(default = "defaults::initial_remaining")]
    pub initial_remaining: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            floor_secs: defaults::floor(),
            ceiling_secs: defaults::ceiling(),
            default_wait_secs: defaults::default_wait(),
            initial_remaining: defaults::initial_remaining(),
        }
    }
}

/// Shard range and naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardConfig {
    /// Lowest valid shard number
    #[serde(default = "defaults::shard_min")]
    pub min: u32,

    /// Highest valid shard number
    #[serde(default = "defaults::shard_max")]
    pub max: u32,

    /// Release ids per shard
    #[serde(default = "defaults::shard_width")]
    pub width: u64,

    /// Queue name prefix
    #[serde(default = "defaults::queue_prefix")]
    pub queue_prefix: String,

    /// Queue name suffix
    #[serde(default = "defaults::queue_suffix")]
    pub queue_suffix: String,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            min: defaults::shard_min(),
            max: defaults::shard_max(),
            width: defaults::shard_width(),
            queue_prefix: defaults::queue_prefix(),
            queue_suffix: defaults::queue_suffix(),
        }
    }
}

mod defaults {
    // API defaults
    pub fn base_url() -> String {
        "https://api.discogs.com".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Store defaults
    pub fn author_name() -> String {
        "discogs-mirror".into()
    }
    pub fn author_email() -> String {
        "discogs-mirror@localhost".into()
    }

    // Queue defaults
    pub fn queue_url() -> String {
        "redis://127.0.0.1:6379".into()
    }

    // Crawl defaults
    pub fn strip_thumbnails() -> bool {
        true
    }
    pub fn max_fetch_attempts() -> u32 {
        5
    }
    pub fn retry_backoff_ms() -> u64 {
        1000
    }

    // Rate defaults
    pub fn floor() -> u64 {
        5
    }
    pub fn ceiling() -> u64 {
        60
    }
    pub fn default_wait() -> u64 {
        60
    }
    pub fn initial_remaining() -> u64 {
        60
    }

    // Shard defaults
    pub fn shard_min() -> u32 {
        1
    }
    pub fn shard_max() -> u32 {
        90
    }
    pub fn shard_width() -> u64 {
        1_000_000
    }
    pub fn queue_prefix() -> String {
        "discogs-".into()
    }
    pub fn queue_suffix() -> String {
        "M".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_backoff_range() {
        let mut config = Config::default();
        config.rate.floor_secs = 120;
        config.rate.ceiling_secs = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_deep_removal_path() {
        let mut config = Config::default();
        config.crawl.remove_fields = vec!["a/b/c".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn crawl_requires_user_token_and_root() {
        let mut config = Config::default();
        assert!(config.validate_for_crawl().is_err());

        config.api.user = "someone".to_string();
        config.api.token = "secret".to_string();
        assert!(config.validate_for_crawl().is_err());

        config.store.root = "/srv/discogs".to_string();
        assert!(config.validate_for_crawl().is_ok());
    }

    #[test]
    fn file_values_override_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [api]
            user = "someone"

            [rate]
            ceiling_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(parsed.api.user, "someone");
        assert_eq!(parsed.api.base_url, "https://api.discogs.com");
        assert_eq!(parsed.rate.ceiling_secs, 120);
        assert_eq!(parsed.rate.floor_secs, 5);
        assert_eq!(parsed.shards.max, 90);
    }
}
