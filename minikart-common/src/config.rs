//! Configuration loading and validation
//!
//! Bootstrap configuration comes from a TOML file. Resolution order for the
//! file path:
//! 1. Command-line argument (highest priority)
//! 2. `MINIKART_CONFIG` environment variable
//! 3. `minikart.toml` in the working directory
//!
//! A missing file is not fatal: built-in defaults are used and a warning is
//! logged. Individual fields can then be overridden from `MINIKART_*`
//! environment variables (see [`TomlConfig::apply_env_overrides`]).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::coupon::{LoadOptions, ValidatorConfig};
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "MINIKART_CONFIG";

/// Config file looked up in the working directory when nothing else is given
pub const DEFAULT_CONFIG_FILE: &str = "minikart.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["console", "json"];

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub coupons: CouponConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// SQLite database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (console or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// API authentication
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Value expected in the `X-API-Key` header
    #[serde(default)]
    pub api_key: String,
}

/// Coupon sources and quorum policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponConfig {
    #[serde(default = "default_coupon_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_min_match_count")]
    pub min_match_count: usize,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    /// Codes each set is pre-sized for while loading
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for CouponConfig {
    fn default() -> Self {
        Self {
            sources: default_coupon_sources(),
            min_match_count: default_min_match_count(),
            min_length: default_min_length(),
            max_length: default_max_length(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            initial_capacity: default_initial_capacity(),
        }
    }
}

impl CouponConfig {
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            sources: self.sources.clone(),
            min_match_count: self.min_match_count,
            code_length: self.min_length..=self.max_length,
            lookup_timeout: Duration::from_millis(self.lookup_timeout_ms),
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            initial_capacity: self.initial_capacity,
            ..LoadOptions::default()
        }
    }
}

/// Object store holding the coupon sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Key prefix prepended to each source identifier
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Endpoint override for S3-compatible stores; AWS regional endpoint if unset
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            region: default_region(),
            prefix: default_prefix(),
            endpoint: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/minikart.db")
}

fn default_max_connections() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

fn default_coupon_sources() -> Vec<String> {
    ValidatorConfig::default().sources
}

fn default_min_match_count() -> usize {
    2
}

fn default_min_length() -> usize {
    8
}

fn default_max_length() -> usize {
    10
}

fn default_lookup_timeout_ms() -> u64 {
    2000
}

fn default_initial_capacity() -> usize {
    1_000_000
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_prefix() -> String {
    "coupons/".to_string()
}

/// Pick the config file path following the documented priority order
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: Working directory default
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

impl TomlConfig {
    /// Parse a config file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file not found at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Full resolution: file (or defaults), then environment, then validation
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(cli_arg);
        let mut config = Self::load(&path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override individual fields from `MINIKART_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(host) = env_value("MINIKART_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_value("MINIKART_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("MINIKART_PORT is not a valid port: {}", port)))?;
        }
        if let Some(path) = env_value("MINIKART_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(level) = env_value("MINIKART_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Some(format) = env_value("MINIKART_LOG_FORMAT") {
            self.logging.format = format.to_lowercase();
        }
        if let Some(key) = env_value("MINIKART_API_KEY") {
            self.auth.api_key = key;
        }
        if let Some(enabled) = env_value("MINIKART_REMOTE_ENABLED") {
            self.remote.enabled = parse_bool(&enabled).ok_or_else(|| {
                Error::Config(format!("MINIKART_REMOTE_ENABLED is not a boolean: {}", enabled))
            })?;
        }
        if let Some(bucket) = env_value("MINIKART_REMOTE_BUCKET") {
            self.remote.bucket = bucket;
        }
        Ok(())
    }

    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server port must be non-zero".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database max_connections must be at least 1".to_string(),
            ));
        }
        if self.auth.api_key.trim().is_empty() {
            return Err(Error::Config(
                "API key is required ([auth] api_key or MINIKART_API_KEY)".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(Error::Config(format!(
                "invalid log level: {} (must be one of {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(Error::Config(format!(
                "invalid log format: {} (must be console or json)",
                self.logging.format
            )));
        }

        let coupons = &self.coupons;
        if coupons.sources.is_empty() {
            return Err(Error::Config("at least one coupon source is required".to_string()));
        }
        if coupons.min_match_count == 0 || coupons.min_match_count > coupons.sources.len() {
            return Err(Error::Config(format!(
                "coupon min_match_count must be between 1 and {} (the number of sources), got {}",
                coupons.sources.len(),
                coupons.min_match_count
            )));
        }
        if coupons.min_length > coupons.max_length {
            return Err(Error::Config(format!(
                "coupon min_length ({}) exceeds max_length ({})",
                coupons.min_length, coupons.max_length
            )));
        }

        if self.remote.enabled && self.remote.bucket.trim().is_empty() {
            return Err(Error::Config(
                "remote bucket is required when remote loading is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> TomlConfig {
        let mut config = TomlConfig::default();
        config.auth.api_key = "test-key".to_string();
        config
    }

    #[test]
    fn test_defaults_match_coupon_policy() {
        let config = TomlConfig::default();
        assert_eq!(config.coupons.sources.len(), 3);
        assert_eq!(config.coupons.min_match_count, 2);
        assert_eq!(config.coupons.min_length, 8);
        assert_eq!(config.coupons.max_length, 10);
        assert_eq!(config.server.address(), "0.0.0.0:8080");
        assert!(!config.remote.enabled);
    }

    #[test]
    fn test_validator_config_conversion() {
        let config = valid_config();
        let validator = config.coupons.validator_config();
        assert_eq!(validator.code_length, 8..=10);
        assert_eq!(validator.lookup_timeout, Duration::from_millis(2000));
        assert_eq!(validator.sources, config.coupons.sources);

        let options = config.coupons.load_options();
        assert_eq!(options.initial_capacity, 1_000_000);
        assert_eq!(options.cancel_check_interval, 1_000_000);
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = TomlConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_quorum_outside_source_count() {
        let mut config = valid_config();
        config.coupons.min_match_count = 4;
        assert!(config.validate().is_err());

        config.coupons.min_match_count = 0;
        assert!(config.validate().is_err());

        config.coupons.min_match_count = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_length_window() {
        let mut config = valid_config();
        config.coupons.min_length = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_settings() {
        let mut config = valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_remote_requires_bucket() {
        let mut config = valid_config();
        config.remote.enabled = true;
        assert!(config.validate().is_err());

        config.remote.bucket = "coupon-bucket".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
