//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `BUCKETDEX_*` environment variable
//! overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub buckets: BucketsConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bucket table artifacts
#[derive(Debug, Clone, Deserialize)]
pub struct BucketsConfig {
    /// Directory holding one `buckets_*.csv` per data type
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,

    /// Generate tables in memory when artifacts are missing instead of failing
    #[serde(default)]
    pub generate_if_missing: bool,
}

fn default_data_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("bucketdex"))
        .unwrap_or_else(|| PathBuf::from("./bucketdex_data"))
}

fn default_artifact_dir() -> String {
    default_data_root().join("buckets").to_string_lossy().to_string()
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            generate_if_missing: false,
        }
    }
}

/// Bulk index build settings
#[derive(Debug, Clone, Deserialize)]
pub struct IndexingConfig {
    /// Documents read per page during a bulk build
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Finished build statuses kept for polling; oldest are dropped first
    #[serde(default = "default_status_retention")]
    pub status_retention: usize,
}

fn default_page_size() -> usize {
    500
}

fn default_status_retention() -> usize {
    1_000
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            status_retention: default_status_retention(),
        }
    }
}

/// Metadata catalog settings
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// JSON file persisting databases, tables and indexes; memory-only if unset
    #[serde(default = "default_metadata_path")]
    pub metadata_path: Option<String>,

    /// Staleness window of the index catalog cache
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_metadata_path() -> Option<String> {
    Some(
        default_data_root()
            .join("catalog.json")
            .to_string_lossy()
            .to_string(),
    )
}

fn default_cache_ttl() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            metadata_path: default_metadata_path(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl CatalogConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8086
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub fn filter_directive(&self) -> String {
        format!("bucketdex={},tower_http={}", self.level, self.level)
    }

    /// Install the global tracing subscriber
    pub fn init(&self) -> Result<(), ConfigError> {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(self.filter_directive()));

        let json = match self.format.as_str() {
            "json" => true,
            "pretty" => false,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown log format '{}', expected pretty or json",
                    other
                )))
            }
        };

        let layer = match &self.file {
            Some(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| ConfigError::Io {
                        path: PathBuf::from(path),
                        error: e.to_string(),
                    })?;
                let writer = Arc::new(file);
                let base = tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false);
                if json {
                    base.json().boxed()
                } else {
                    base.boxed()
                }
            }
            None => {
                let base = tracing_subscriber::fmt::layer();
                if json {
                    base.json().boxed()
                } else {
                    base.boxed()
                }
            }
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
            .map_err(|e| ConfigError::Invalid(format!("logging already initialized: {}", e)))
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("bucketdex").join("config.toml")),
            Some(PathBuf::from("/etc/bucketdex/config.toml")),
            Some(PathBuf::from("./bucketdex.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Buckets
        if let Ok(dir) = std::env::var("BUCKETDEX_ARTIFACT_DIR") {
            self.buckets.artifact_dir = dir;
        }
        if let Ok(flag) = std::env::var("BUCKETDEX_GENERATE_IF_MISSING") {
            self.buckets.generate_if_missing = flag == "1" || flag.eq_ignore_ascii_case("true");
        }

        // Indexing
        if let Ok(size) = std::env::var("BUCKETDEX_PAGE_SIZE") {
            if let Ok(n) = size.parse() {
                self.indexing.page_size = n;
            }
        }

        // Catalog
        if let Ok(path) = std::env::var("BUCKETDEX_METADATA_PATH") {
            self.catalog.metadata_path = if path.is_empty() { None } else { Some(path) };
        }
        if let Ok(ttl) = std::env::var("BUCKETDEX_CACHE_TTL_SECS") {
            if let Ok(n) = ttl.parse() {
                self.catalog.cache_ttl_secs = n;
            }
        }

        // API
        if let Ok(host) = std::env::var("BUCKETDEX_API_HOST") {
            self.api.host = host;
        }
        if let Ok(port) = std::env::var("BUCKETDEX_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging
        if let Ok(level) = std::env::var("BUCKETDEX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("BUCKETDEX_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexing.page_size == 0 {
            return Err(ConfigError::Invalid(
                "indexing.page_size must be positive".to_string(),
            ));
        }
        if self.buckets.artifact_dir.is_empty() {
            return Err(ConfigError::Invalid(
                "buckets.artifact_dir must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Bucketdex Configuration
#
# Environment variables override these settings:
# - BUCKETDEX_ARTIFACT_DIR
# - BUCKETDEX_GENERATE_IF_MISSING
# - BUCKETDEX_PAGE_SIZE
# - BUCKETDEX_METADATA_PATH (empty string = memory only)
# - BUCKETDEX_CACHE_TTL_SECS
# - BUCKETDEX_API_HOST
# - BUCKETDEX_API_PORT
# - BUCKETDEX_LOG_LEVEL
# - BUCKETDEX_LOG_FORMAT

[buckets]
# Directory with the bucket artifacts written by `bucketgen`
artifact_dir = "./bucketdex_data/buckets"

# Generate tables in memory if an artifact is missing (startup fails otherwise)
generate_if_missing = false

[indexing]
# Documents read per page while building a new index
page_size = 500

# Finished build statuses kept for polling
status_retention = 1000

[catalog]
# JSON file holding databases, tables and index definitions
metadata_path = "./bucketdex_data/catalog.json"

# Seconds an index catalog stays cached before it is reloaded
cache_ttl_secs = 30

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8086

# Allowed CORS origins (empty = permissive)
cors_origins = []

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/bucketdex/bucketdex.log"
"#
    .to_string()
}
