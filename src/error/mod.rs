//! Error handling module for ReelTrim

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for ReelTrim operations
#[derive(Error, Debug)]
pub enum ReelTrimError {
    /// Trim session or engine error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Configuration could not be parsed or failed validation
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Simulation script error
    #[error("Invalid script: {message}")]
    ScriptError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type alias for ReelTrim operations
pub type ReelTrimResult<T> = std::result::Result<T, ReelTrimError>;
