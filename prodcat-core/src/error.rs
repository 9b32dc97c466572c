//! Structured error types for prodcat-core.
//!
//! Uses `thiserror` so the binary can attach `anyhow` context while library
//! consumers still get typed, composable errors.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file exists but could not be read
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML
    #[error("invalid TOML in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// DB_PORT (or the file's port key) is not a valid port number
    #[error("invalid database port '{value}'")]
    InvalidPort { value: String },
}

/// Result type alias for prodcat-core operations
pub type Result<T> = std::result::Result<T, ConfigError>;
