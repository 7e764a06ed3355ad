//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CODEX_CACHE_*)
//! 2. TOML config file (if CODEX_CACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CODEX_CACHE_*)
/// 2. TOML config file (if CODEX_CACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory holding cached documents and `index.json`.
    ///
    /// Set via CODEX_CACHE_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// TTL applied when a caller does not pass one.
    ///
    /// Set via CODEX_CACHE_DEFAULT_TTL_DAYS environment variable.
    #[serde(default = "default_ttl_days")]
    pub default_ttl_days: u32,

    /// Health and metrics thresholds.
    ///
    /// Nested keys use a double underscore, e.g. CODEX_CACHE_THRESHOLDS__HIT_RATE_PERCENT.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Whether cached content is compressed on disk.
    ///
    /// Only feeds the metrics recommendation; content is stored as-is.
    #[serde(default)]
    pub compression_enabled: bool,

    /// External tools the system health check requires on PATH.
    #[serde(default = "default_required_tools")]
    pub required_tools: Vec<String>,

    /// Upper bound for a single OS probe in the health check, in milliseconds.
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via CODEX_CACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per document.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Base URL that `@codex/{project}/{path}` references resolve against.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Allow fetching from private or loopback addresses.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

/// Thresholds shared by the health checker and the metrics recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Expired entries at or above this percentage produce a warning.
    #[serde(default = "default_expired_ratio_percent")]
    pub expired_ratio_percent: f64,

    /// Hit rates below this percentage produce a warning.
    #[serde(default = "default_hit_rate_percent")]
    pub hit_rate_percent: f64,

    /// Available space below this many MiB is a health error.
    #[serde(default = "default_min_free_disk_mb")]
    pub min_free_disk_mb: u64,

    /// Free space below this percentage of the volume is a recommendation.
    #[serde(default = "default_min_free_disk_percent")]
    pub min_free_disk_percent: f64,

    /// Cache size above which enabling compression is recommended.
    #[serde(default = "default_compression_size_bytes")]
    pub compression_size_bytes: u64,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./.codex-cache")
}

fn default_ttl_days() -> u32 {
    7
}

fn default_required_tools() -> Vec<String> {
    vec!["git".into(), "jq".into()]
}

fn default_check_timeout_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    "codex-cache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_expired_ratio_percent() -> f64 {
    20.0
}

fn default_hit_rate_percent() -> f64 {
    70.0
}

fn default_min_free_disk_mb() -> u64 {
    100
}

fn default_min_free_disk_percent() -> f64 {
    10.0
}

fn default_compression_size_bytes() -> u64 {
    100 * 1024 * 1024
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            expired_ratio_percent: default_expired_ratio_percent(),
            hit_rate_percent: default_hit_rate_percent(),
            min_free_disk_mb: default_min_free_disk_mb(),
            min_free_disk_percent: default_min_free_disk_percent(),
            compression_size_bytes: default_compression_size_bytes(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            default_ttl_days: default_ttl_days(),
            thresholds: Thresholds::default(),
            compression_enabled: false,
            required_tools: default_required_tools(),
            check_timeout_ms: default_check_timeout_ms(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            base_url: None,
            allow_private_hosts: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Health probe timeout as Duration.
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CODEX_CACHE_`
    /// 2. TOML file from `CODEX_CACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CODEX_CACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CODEX_CACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(&figment)
    }

    /// Extract and validate a configuration from an already-layered figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
