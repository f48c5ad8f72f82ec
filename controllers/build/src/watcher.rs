//! Kubernetes resource watchers.
//!
//! Event handlers wiring the Build and Pod feeds into the reconciler.

use crate::error::ControllerError;
use crate::reconciler::{BuildReconciler, PodObservation};
use async_trait::async_trait;
use crds::Build;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;
use watch_runtime::{EventHandler, EventType};

/// Keeps the build store current and dispatches new builds.
#[derive(Clone)]
pub struct BuildEventHandler {
    reconciler: Arc<BuildReconciler>,
}

impl BuildEventHandler {
    /// Creates a handler.
    pub fn new(reconciler: Arc<BuildReconciler>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl EventHandler<Build> for BuildEventHandler {
    type Error = ControllerError;

    async fn handle(&self, event_type: EventType, build: Build) -> Result<(), ControllerError> {
        let Some(current) = self.reconciler.store().apply(event_type, &build) else {
            debug!("Build {} {}", build.name_any(), event_type);
            return Ok(());
        };
        self.reconciler.handle_build(&current).await
    }
}

/// Folds worker pod changes into their builds.
#[derive(Clone)]
pub struct PodEventHandler {
    reconciler: Arc<BuildReconciler>,
}

impl PodEventHandler {
    /// Creates a handler.
    pub fn new(reconciler: Arc<BuildReconciler>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl EventHandler<Pod> for PodEventHandler {
    type Error = ControllerError;

    async fn handle(&self, event_type: EventType, pod: Pod) -> Result<(), ControllerError> {
        if !event_type.is_upsert() {
            debug!("Ignoring {} pod {}", event_type, pod.name_any());
            return Ok(());
        }
        let observation = PodObservation::from_pod(&pod);
        self.reconciler.handle_pod(&observation).await
    }
}
