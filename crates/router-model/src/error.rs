//! Router errors

use thiserror::Error;

/// Errors that can occur while persisting or reloading router configuration
#[derive(Debug, Error)]
pub enum RouterError {
    /// Filesystem error reading or writing the config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reload command failed
    #[error("Reload failed: {0}")]
    Reload(String),
}
