//! Core error types for reelharvest.
//!
//! `HarvestError` is the central error used at crate boundaries. Configuration
//! problems have their own type because they are always fatal and always
//! surface before any scraping work starts.

use thiserror::Error;

/// Central error type for reelharvest operations.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Configuration errors (input files, config TOML, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No usable proxy endpoint remains
    #[error("proxy pool exhausted: {0}")]
    ProxyExhausted(String),

    /// Browser automation errors (navigation, script evaluation)
    #[error("browser error: {0}")]
    Browser(String),

    /// Record extraction errors
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Input or config file not found
    #[error("file not found at {path}")]
    NotFound {
        /// Path where the file was expected
        path: String,
    },

    /// File exists but yielded no usable entries
    #[error("no usable entries in {path}")]
    Empty {
        /// Path of the empty file
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `HarvestError`.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
