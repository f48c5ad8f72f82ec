//! Controller-specific error types.
//!
//! This module defines error types specific to the Router Controller
//! that are not covered by upstream library errors.

use kube::Error as KubeError;
use router_model::RouterError;
use thiserror::Error;
use watch_runtime::WatchError;

/// Errors that can occur in the Router Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Router model error (loading the existing config)
    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    /// Watch runtime error (configuration or feed setup)
    #[error("Watch runtime error: {0}")]
    Runtime(#[from] WatchError),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
