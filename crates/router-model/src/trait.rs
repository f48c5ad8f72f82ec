//! Router capability trait
//!
//! The router controller depends only on this trait; the concrete
//! [`ConfigRouter`](crate::ConfigRouter) and the test
//! [`MockRouter`](crate::MockRouter) implement it.

use crate::error::RouterError;
use crate::model::{Endpoint, Frontend};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Mutable load balancer configuration plus persistence and reload.
///
/// Callers serialize access themselves (the router controller holds one lock
/// around every sequence of calls). Model mutations are synchronous; only
/// persistence and reload touch the filesystem or spawn processes.
#[async_trait]
pub trait Router: Send {
    /// Looks up a frontend by service id.
    fn find_frontend(&self, name: &str) -> Option<&Frontend>;

    /// Creates an empty frontend; an existing frontend is left untouched.
    fn create_frontend(&mut self, name: &str, url: &str);

    /// Adds a host alias to a frontend (created if missing). Adding an alias
    /// twice has no effect.
    fn add_alias(&mut self, alias: &str, frontend_name: &str);

    /// Removes a frontend with all of its aliases and backends.
    fn delete_frontend(&mut self, name: &str);

    /// Removes every backend of a frontend, keeping the frontend and aliases.
    fn delete_backends(&mut self, name: &str);

    /// Registers a backend with the given endpoints on a frontend (created if
    /// missing). Endpoints are stored exactly as given, in order.
    fn add_route(
        &mut self,
        frontend_name: &str,
        alias: &str,
        path: &str,
        annotations: Option<&BTreeMap<String, String>>,
        endpoints: &[Endpoint],
    );

    /// Persists the current model.
    async fn write_config(&mut self) -> Result<(), RouterError>;

    /// Makes the load balancer pick up the persisted model.
    async fn reload_router(&mut self) -> Result<(), RouterError>;
}
