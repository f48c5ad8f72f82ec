//! Kubernetes resource watchers.
//!
//! Event handlers wiring the Route and Endpoints feeds into the reconciler.

use crate::endpoints::EndpointSet;
use crate::error::ControllerError;
use crate::reconciler::LoadBalancerReconciler;
use async_trait::async_trait;
use crds::Route;
use k8s_openapi::api::core::v1::Endpoints;
use router_model::Router;
use std::sync::Arc;
use watch_runtime::{EventHandler, EventType};

/// Feeds Route changes to the reconciler.
pub struct RouteEventHandler<R> {
    reconciler: Arc<LoadBalancerReconciler<R>>,
}

impl<R> RouteEventHandler<R> {
    /// Creates a handler.
    pub fn new(reconciler: Arc<LoadBalancerReconciler<R>>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl<R: Router + 'static> EventHandler<Route> for RouteEventHandler<R> {
    type Error = ControllerError;

    async fn handle(&self, event_type: EventType, route: Route) -> Result<(), ControllerError> {
        self.reconciler.sync_routes(event_type, &route).await;
        Ok(())
    }
}

/// Feeds Endpoints changes to the reconciler.
pub struct EndpointsEventHandler<R> {
    reconciler: Arc<LoadBalancerReconciler<R>>,
}

impl<R> EndpointsEventHandler<R> {
    /// Creates a handler.
    pub fn new(reconciler: Arc<LoadBalancerReconciler<R>>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl<R: Router + 'static> EventHandler<Endpoints> for EndpointsEventHandler<R> {
    type Error = ControllerError;

    async fn handle(
        &self,
        event_type: EventType,
        endpoints: Endpoints,
    ) -> Result<(), ControllerError> {
        let set = EndpointSet::from(&endpoints);
        self.reconciler.sync_endpoints(event_type, &set).await;
        Ok(())
    }
}
