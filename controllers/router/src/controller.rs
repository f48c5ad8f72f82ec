//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the router model
//! to the Route and Endpoints watch loops.

use crate::config::RouterConfig;
use crate::error::ControllerError;
use crate::reconciler::LoadBalancerReconciler;
use crate::watcher::{EndpointsEventHandler, RouteEventHandler};
use crds::Route;
use k8s_openapi::api::core::v1::Endpoints;
use kube::{Api, Client};
use router_model::ConfigRouter;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;
use watch_runtime::{KubeEventSource, ReconciliationLoop};

/// Main controller for the router.
pub struct Controller {
    route_watcher: JoinHandle<()>,
    endpoints_watcher: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller instance and starts both watch loops.
    pub async fn new(config: RouterConfig) -> Result<Self, ControllerError> {
        info!("Initializing Router Controller");

        let router = ConfigRouter::load(&config.config_path, config.reload_command.clone()).await?;
        info!("Router model has {} frontends", router.table().len());
        let reconciler = Arc::new(LoadBalancerReconciler::new(Arc::new(Mutex::new(router))));

        let kube_client = Client::try_default().await?;
        let (route_api, endpoints_api): (Api<Route>, Api<Endpoints>) =
            match config.watch.namespace.as_deref() {
                Some(ns) => (
                    Api::namespaced(kube_client.clone(), ns),
                    Api::namespaced(kube_client, ns),
                ),
                None => (Api::all(kube_client.clone()), Api::all(kube_client)),
            };

        let route_loop = ReconciliationLoop::new(
            KubeEventSource::new(route_api),
            RouteEventHandler::new(reconciler.clone()),
        )
        .with_settings(&config.watch);

        let endpoints_loop = ReconciliationLoop::new(
            KubeEventSource::new(endpoints_api),
            EndpointsEventHandler::new(reconciler),
        )
        .with_settings(&config.watch);

        let route_watcher = tokio::spawn(route_loop.run());
        let endpoints_watcher = tokio::spawn(endpoints_loop.run());

        Ok(Self {
            route_watcher,
            endpoints_watcher,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Router Controller running");

        // Loops never return; reaching here means one of them died
        tokio::select! {
            result = &mut self.route_watcher => {
                result.map_err(|e| {
                    ControllerError::Watch(format!("Route watcher panicked: {}", e))
                })?;
            }
            result = &mut self.endpoints_watcher => {
                result.map_err(|e| {
                    ControllerError::Watch(format!("Endpoints watcher panicked: {}", e))
                })?;
            }
        }

        Err(ControllerError::Watch("watch loop exited".to_string()))
    }
}
