//! Controller-specific error types.
//!
//! This module defines error types specific to the Build Controller
//! that are not covered by upstream library errors.

use kube::Error as KubeError;
use thiserror::Error;
use watch_runtime::WatchError;

/// Errors that can occur in the Build Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Watch runtime error (configuration or feed setup)
    #[error("Watch runtime error: {0}")]
    Runtime(#[from] WatchError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Build strategy could not render a worker pod
    #[error("Build strategy failed: {0}")]
    Strategy(String),

    /// Build status could not be persisted
    #[error("Status write failed: {0}")]
    StatusWrite(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

/// Outcome of a failed pod create request.
#[derive(Debug, Error)]
pub enum PodCreateError {
    /// A pod with that name already exists
    #[error("pod already exists")]
    AlreadyExists,

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

/// HTTP status returned when the object already exists
const CONFLICT: u16 = 409;

impl From<KubeError> for PodCreateError {
    fn from(error: KubeError) -> Self {
        match error {
            KubeError::Api(response)
                if response.code == CONFLICT || response.reason == "AlreadyExists" =>
            {
                PodCreateError::AlreadyExists
            }
            other => PodCreateError::Other(other.to_string()),
        }
    }
}
