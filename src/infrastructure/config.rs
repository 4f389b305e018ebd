//! Configuration infrastructure
//!
//! Settings are layered: built-in defaults, then an optional config file
//! (`--config PATH` or `catalog-sync.toml` in the working directory), then
//! environment variables prefixed with `CATALOG_SYNC__` using `__` as the
//! section separator (e.g. `CATALOG_SYNC__SYNC__CLEANUP_DAYS=14`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "catalog-sync.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CATALOG_SYNC";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub extraction: ExtractionConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite:///var/lib/catalog-sync/products.db`
    pub url: String,

    /// Pool size
    pub max_connections: u32,
}

/// Listing extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Listing pages fetched by `sync` when no `--url` is given
    pub target_urls: Vec<String>,

    pub user_agent: String,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Attempts per listing page, including the first one
    pub max_retries: u32,

    /// Base delay of the exponential backoff between attempts
    pub retry_delay_ms: u64,

    /// Upper bound for a single backoff delay
    pub max_retry_delay_ms: u64,

    pub requests_per_second: u32,

    /// Listing pages fetched concurrently
    pub max_concurrent_requests: usize,

    /// Cards parsed per listing page; 0 means unlimited
    pub max_products_per_page: usize,

    /// Category assigned when the page does not expose one
    pub default_category: String,

    /// Used to absolutize relative product and image links
    pub base_url: String,

    /// Retailer tag stored with every product
    pub source_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Refresh `scraped_at` of unchanged products so retention measures "last seen"
    pub refresh_seen_timestamps: bool,

    /// Run retention housekeeping after a successful sync
    pub cleanup_enabled: bool,

    /// Products not seen for this many days are deleted by housekeeping
    pub cleanup_days: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output (stderr)
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for rolling log files; defaults to the platform data dir
    pub log_dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: defaults::MAX_CONNECTIONS,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            target_urls: vec![defaults::TARGET_URL.to_string()],
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
            max_retry_delay_ms: defaults::MAX_RETRY_DELAY_MS,
            requests_per_second: defaults::REQUESTS_PER_SECOND,
            max_concurrent_requests: defaults::MAX_CONCURRENT_REQUESTS,
            max_products_per_page: defaults::MAX_PRODUCTS_PER_PAGE,
            default_category: defaults::DEFAULT_CATEGORY.to_string(),
            base_url: defaults::BASE_URL.to_string(),
            source_tag: Some(defaults::SOURCE_TAG.to_string()),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_seen_timestamps: true,
            cleanup_enabled: true,
            cleanup_days: defaults::CLEANUP_DAYS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from defaults, an optional file and the environment.
    ///
    /// An explicit `path` must exist; the implicit `catalog-sync.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = config::Config::try_from(&Self::default())?;

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("extraction.target_urls")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;

        info!("⚙️ Configuration loaded (database: {})", config.database.url);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::invalid("database.url must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid("database.max_connections must be greater than 0"));
        }

        let extraction = &self.extraction;
        if extraction.max_retries == 0 {
            return Err(ConfigError::invalid("extraction.max_retries must be at least 1"));
        }
        if extraction.request_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "extraction.request_timeout_seconds must be greater than 0",
            ));
        }
        if extraction.requests_per_second == 0 {
            return Err(ConfigError::invalid(
                "extraction.requests_per_second must be greater than 0",
            ));
        }
        if extraction.max_concurrent_requests == 0 {
            return Err(ConfigError::invalid(
                "extraction.max_concurrent_requests must be greater than 0",
            ));
        }
        if extraction.retry_delay_ms > extraction.max_retry_delay_ms {
            return Err(ConfigError::invalid(
                "extraction.retry_delay_ms cannot be greater than max_retry_delay_ms",
            ));
        }
        if extraction.default_category.trim().is_empty() {
            return Err(ConfigError::invalid("extraction.default_category must not be empty"));
        }

        if self.sync.cleanup_enabled && self.sync.cleanup_days == 0 {
            return Err(ConfigError::invalid(
                "sync.cleanup_days must be greater than 0 when cleanup is enabled",
            ));
        }

        if self.sync.cleanup_enabled && !self.sync.refresh_seen_timestamps {
            return Err(ConfigError::invalid(
                "sync.cleanup_enabled requires sync.refresh_seen_timestamps",
            ));
        }

        if !self.logging.console_output && !self.logging.file_output {
            return Err(ConfigError::invalid(
                "at least one of logging.console_output / logging.file_output must be enabled",
            ));
        }

        Ok(())
    }
}

/// Application data directory (`~/.local/share/catalog-sync` on Linux)
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catalog-sync")
}

pub fn default_database_url() -> String {
    format!("sqlite://{}", app_data_dir().join("products.db").display())
}

pub fn default_log_dir() -> PathBuf {
    app_data_dir().join("logs")
}

/// Default configuration values
pub mod defaults {
    pub const MAX_CONNECTIONS: u32 = 5;

    /// Men's "view all" listing
    pub const TARGET_URL: &str = "https://www.zara.com/tn/fr/homme-tout-l7465.html?v1=2443335";

    pub const BASE_URL: &str = "https://www.zara.com";

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    pub const MAX_RETRIES: u32 = 3;

    pub const RETRY_DELAY_MS: u64 = 1000;

    pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

    pub const REQUESTS_PER_SECOND: u32 = 1;

    pub const MAX_CONCURRENT_REQUESTS: usize = 2;

    pub const MAX_PRODUCTS_PER_PAGE: usize = 50;

    pub const DEFAULT_CATEGORY: &str = "Men";

    pub const SOURCE_TAG: &str = "zara";

    pub const CLEANUP_DAYS: u32 = 30;
}
