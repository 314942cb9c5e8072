//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Event API limits.
    #[serde(default)]
    pub events: EventsConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// Per-connection page cache, in KiB.
    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "calvault_events=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Limits applied to `POST /api/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Largest page a client may request; also the default page size.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Most explicit ids a single request may list across all filters.
    #[serde(default = "default_max_filter_ids")]
    pub max_filter_ids: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "calvault.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_cache_size_kib() -> u32 {
    16_384
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_page_size() -> u32 {
    200
}

fn default_max_filter_ids() -> usize {
    1_000
}

/// Upper bound for `events.max_filter_ids`. Each id is bound twice, and the
/// result must stay below SQLite's default limit of 32766 host parameters.
pub const MAX_FILTER_IDS_CEILING: usize = 16_000;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            cache_size_kib: default_cache_size_kib(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            max_filter_ids: default_max_filter_ids(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting is outside its accepted range.
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// Dotted path of the offending setting.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CALVAULT_HOST` overrides `server.host`
/// - `CALVAULT_PORT` overrides `server.port`
/// - `CALVAULT_DB_PATH` overrides `database.path`
/// - `CALVAULT_DB_BUSY_TIMEOUT_MS` overrides `database.busy_timeout_ms`
/// - `CALVAULT_DB_POOL_MAX_SIZE` overrides `database.pool_max_size`
/// - `CALVAULT_LOG_LEVEL` overrides `logging.level`
/// - `CALVAULT_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `CALVAULT_MAX_PAGE_SIZE` overrides `events.max_page_size`
/// - `CALVAULT_MAX_FILTER_IDS` overrides `events.max_filter_ids`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if a setting is out of range after overrides are applied.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    // A zero page size would reach the query as "no limit".
    if config.events.max_page_size == 0 {
        return Err(ConfigError::Invalid {
            key: "events.max_page_size",
            reason: "must be at least 1".to_string(),
        });
    }
    if !(1..=MAX_FILTER_IDS_CEILING).contains(&config.events.max_filter_ids) {
        return Err(ConfigError::Invalid {
            key: "events.max_filter_ids",
            reason: format!("must be between 1 and {MAX_FILTER_IDS_CEILING}"),
        });
    }
    if config.database.pool_max_size == 0 {
        return Err(ConfigError::Invalid {
            key: "database.pool_max_size",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(parsed) = var("CALVAULT_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = parsed;
    }
    if let Some(parsed) = var("CALVAULT_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = parsed;
    }
    if let Some(db_path) = var("CALVAULT_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(parsed) = var("CALVAULT_DB_BUSY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.database.busy_timeout_ms = parsed;
    }
    if let Some(parsed) = var("CALVAULT_DB_POOL_MAX_SIZE").and_then(|v| v.parse().ok()) {
        config.database.pool_max_size = parsed;
    }
    if let Some(level) = var("CALVAULT_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("CALVAULT_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(parsed) = var("CALVAULT_MAX_PAGE_SIZE").and_then(|v| v.parse().ok()) {
        config.events.max_page_size = parsed;
    }
    if let Some(parsed) = var("CALVAULT_MAX_FILTER_IDS").and_then(|v| v.parse().ok()) {
        config.events.max_filter_ids = parsed;
    }
}
