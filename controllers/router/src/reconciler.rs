//! Route and endpoint synchronisation into the router model.
//!
//! Every sync takes the router lock for its whole sequence of calls, ending
//! with a config write and a reload, so concurrent syncs never interleave.

use crate::endpoints::{EndpointSet, parse_endpoints};
use crds::Route;
use router_model::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use watch_runtime::EventType;
use watch_runtime::metrics::{record_router_persist_failure, record_router_sync};

/// Applies Route and Endpoints changes to a shared [`Router`].
pub struct LoadBalancerReconciler<R> {
    router: Arc<Mutex<R>>,
}

impl<R: Router> LoadBalancerReconciler<R> {
    /// Creates a reconciler over a shared router.
    pub fn new(router: Arc<Mutex<R>>) -> Self {
        Self { router }
    }

    /// The shared router.
    pub fn router(&self) -> &Arc<Mutex<R>> {
        &self.router
    }

    /// Adds the route's host alias to its service frontend, or removes the
    /// whole frontend when the route is deleted. Always persists and reloads.
    pub async fn sync_routes(&self, event_type: EventType, route: &Route) {
        let id = route.service_id();
        let mut router = self.router.lock().await;
        if router.find_frontend(id).is_none() {
            router.create_frontend(id, "");
        }

        match event_type {
            EventType::Added | EventType::Modified => {
                router.add_alias(&route.spec.host, id);
                info!("Route {} -> {}", route.spec.host, id);
            }
            EventType::Deleted => {
                router.delete_frontend(id);
                info!("Removed frontend {}", id);
            }
            EventType::Error => debug!("Ignoring error event for route {}", id),
        }

        record_router_sync("route", event_type);
        persist(&mut *router).await;
    }

    /// Replaces the backends of the set's frontend with its endpoints; a
    /// deleted set leaves the frontend with no backends. Always persists and
    /// reloads.
    pub async fn sync_endpoints(&self, event_type: EventType, set: &EndpointSet) {
        let id = set.id.as_str();
        let mut router = self.router.lock().await;
        if router.find_frontend(id).is_none() {
            router.create_frontend(id, "");
        }
        router.delete_backends(id);

        if event_type.is_upsert() {
            let endpoints = parse_endpoints(&set.endpoints);
            info!("Frontend {} has {} endpoints", id, endpoints.len());
            router.add_route(id, "", "", None, &endpoints);
        } else {
            info!("Cleared backends of frontend {}", id);
        }

        record_router_sync("endpoints", event_type);
        persist(&mut *router).await;
    }
}

async fn persist<R: Router>(router: &mut R) {
    if let Err(e) = router.write_config().await {
        warn!("Failed to write router config: {}", e);
        record_router_persist_failure("write");
    }
    if let Err(e) = router.reload_router().await {
        warn!("Failed to reload router: {}", e);
        record_router_persist_failure("reload");
    }
}
