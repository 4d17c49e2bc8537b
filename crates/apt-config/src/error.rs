//! Configuration error type.

use thiserror::Error;

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed or didn't match the schema.
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ConfigError>;
