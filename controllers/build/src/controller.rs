//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the reconciler to
//! the Build and Pod watch loops.

use crate::client::{KubeBuildUpdater, KubePodCreator};
use crate::config::BuildConfig;
use crate::error::ControllerError;
use crate::reconciler::BuildReconciler;
use crate::store::BuildStore;
use crate::strategy::DockerBuildStrategy;
use crate::watcher::{BuildEventHandler, PodEventHandler};
use crds::Build;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;
use watch_runtime::{KubeEventSource, ReconciliationLoop};

/// Main controller for builds.
pub struct Controller {
    build_watcher: JoinHandle<()>,
    pod_watcher: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller instance and starts both watch loops.
    pub async fn new(config: BuildConfig) -> Result<Self, ControllerError> {
        info!("Initializing Build Controller");

        let kube_client = Client::try_default().await?;

        let (build_api, pod_api): (Api<Build>, Api<Pod>) = match config.watch.namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(kube_client.clone(), ns),
                Api::namespaced(kube_client.clone(), ns),
            ),
            None => (
                Api::all(kube_client.clone()),
                Api::all(kube_client.clone()),
            ),
        };

        let reconciler = BuildReconciler::new(
            Box::new(DockerBuildStrategy::new(config.builder_image.clone())),
            Box::new(KubePodCreator::new(kube_client.clone())),
            Box::new(KubeBuildUpdater::new(kube_client)),
            BuildStore::new(),
        )
        .with_write_retry(config.status_write_attempts, config.status_write_retry);
        let reconciler = Arc::new(reconciler);

        let build_loop = ReconciliationLoop::new(
            KubeEventSource::new(build_api),
            BuildEventHandler::new(reconciler.clone()),
        )
        .with_settings(&config.watch);

        let pod_loop = ReconciliationLoop::new(
            KubeEventSource::new(pod_api),
            PodEventHandler::new(reconciler),
        )
        .with_settings(&config.watch);

        let build_watcher = tokio::spawn(build_loop.run());
        let pod_watcher = tokio::spawn(pod_loop.run());

        Ok(Self {
            build_watcher,
            pod_watcher,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Build Controller running");

        // Loops never return; reaching here means one of them died
        tokio::select! {
            result = &mut self.build_watcher => {
                result.map_err(|e| {
                    ControllerError::Watch(format!("Build watcher panicked: {}", e))
                })?;
            }
            result = &mut self.pod_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Pod watcher panicked: {}", e)))?;
            }
        }

        Err(ControllerError::Watch("watch loop exited".to_string()))
    }
}
