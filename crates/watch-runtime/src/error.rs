//! Watch errors

use thiserror::Error;

/// Errors raised while opening or consuming a change feed
#[derive(Debug, Error)]
pub enum WatchError {
    /// Kubernetes API error while opening the watch
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The feed could not be opened
    #[error("Failed to open watch: {0}")]
    Open(String),

    /// An event payload could not be decoded into the watched kind
    #[error("Unrecognized event payload: {0}")]
    Decode(String),

    /// Invalid watch settings
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The feed broke mid-stream
    #[error("Watch stream failed: {0}")]
    Stream(String),
}
