//! Core error types

use thiserror::Error;

/// Configuration error for the lift-call client
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting has no value
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting holds a placeholder value that must be replaced
    #[error("Setting {0} still holds its placeholder value")]
    Placeholder(&'static str),

    /// A setting could not be parsed
    #[error("Invalid value for {key}: {value}")]
    Invalid {
        /// Setting name
        key: &'static str,
        /// Offending raw value
        value: String,
    },

    /// IO error while reading a config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML
    #[cfg(feature = "toml")]
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
