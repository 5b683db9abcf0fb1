//! Common error types for Mini-Kart

use thiserror::Error;

/// Common result type for Mini-Kart operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside the per-request validation path
///
/// Validation outcomes are values ([`crate::coupon::Validation`]), not errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
