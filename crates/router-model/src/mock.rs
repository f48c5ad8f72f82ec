//! Recording router for tests
//!
//! Every call is appended to an operation log so tests can assert on the
//! exact sequence the router controller issued.

use crate::error::RouterError;
use crate::model::{Backend, Endpoint, Frontend, FrontendTable};
use crate::router_trait::Router;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// One recorded router call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterOp {
    /// `find_frontend(name)`
    Find(String),
    /// `create_frontend(name, url)`
    CreateFrontend(String),
    /// `add_alias(alias, frontend)`
    AddAlias {
        /// Host alias
        alias: String,
        /// Frontend name
        frontend: String,
    },
    /// `delete_frontend(name)`
    DeleteFrontend(String),
    /// `delete_backends(name)`
    DeleteBackends(String),
    /// `add_route(name, .., endpoints)`
    AddRoute {
        /// Frontend name
        frontend: String,
        /// Endpoints as passed
        endpoints: Vec<Endpoint>,
    },
    /// `write_config()`
    WriteConfig,
    /// `reload_router()`
    ReloadRouter,
}

impl RouterOp {
    /// Frontend name the op refers to, if any.
    pub fn frontend(&self) -> Option<&str> {
        match self {
            RouterOp::Find(name)
            | RouterOp::CreateFrontend(name)
            | RouterOp::DeleteFrontend(name)
            | RouterOp::DeleteBackends(name) => Some(name),
            RouterOp::AddAlias { frontend, .. } | RouterOp::AddRoute { frontend, .. } => {
                Some(frontend)
            }
            RouterOp::WriteConfig | RouterOp::ReloadRouter => None,
        }
    }
}

/// In-memory router that records calls and can be told to fail persistence.
#[derive(Debug, Default)]
pub struct MockRouter {
    table: FrontendTable,
    ops: Mutex<Vec<RouterOp>>,
    fail_write: bool,
    fail_reload: bool,
}

impl MockRouter {
    /// Creates an empty mock router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `write_config` call fail.
    pub fn failing_write(mut self) -> Self {
        self.fail_write = true;
        self
    }

    /// Makes every `reload_router` call fail.
    pub fn failing_reload(mut self) -> Self {
        self.fail_reload = true;
        self
    }

    /// Current model.
    pub fn table(&self) -> &FrontendTable {
        &self.table
    }

    /// Snapshot of the recorded calls.
    pub fn ops(&self) -> Vec<RouterOp> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of `write_config` calls.
    pub fn writes(&self) -> usize {
        self.count(&RouterOp::WriteConfig)
    }

    /// Number of `reload_router` calls.
    pub fn reloads(&self) -> usize {
        self.count(&RouterOp::ReloadRouter)
    }

    fn count(&self, op: &RouterOp) -> usize {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|o| *o == op)
            .count()
    }

    fn record(&self, op: RouterOp) {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner).push(op);
    }
}

#[async_trait]
impl Router for MockRouter {
    fn find_frontend(&self, name: &str) -> Option<&Frontend> {
        self.record(RouterOp::Find(name.to_string()));
        self.table.get(name)
    }

    fn create_frontend(&mut self, name: &str, url: &str) {
        self.record(RouterOp::CreateFrontend(name.to_string()));
        self.table.ensure(name, url);
    }

    fn add_alias(&mut self, alias: &str, frontend_name: &str) {
        self.record(RouterOp::AddAlias {
            alias: alias.to_string(),
            frontend: frontend_name.to_string(),
        });
        self.table.add_alias(alias, frontend_name);
    }

    fn delete_frontend(&mut self, name: &str) {
        self.record(RouterOp::DeleteFrontend(name.to_string()));
        self.table.remove(name);
    }

    fn delete_backends(&mut self, name: &str) {
        self.record(RouterOp::DeleteBackends(name.to_string()));
        self.table.clear_backends(name);
    }

    fn add_route(
        &mut self,
        frontend_name: &str,
        alias: &str,
        path: &str,
        annotations: Option<&BTreeMap<String, String>>,
        endpoints: &[Endpoint],
    ) {
        self.record(RouterOp::AddRoute {
            frontend: frontend_name.to_string(),
            endpoints: endpoints.to_vec(),
        });
        self.table.add_backend(
            frontend_name,
            Backend {
                alias: alias.to_string(),
                path: path.to_string(),
                annotations: annotations.cloned().unwrap_or_default(),
                endpoints: endpoints.to_vec(),
            },
        );
    }

    async fn write_config(&mut self) -> Result<(), RouterError> {
        self.record(RouterOp::WriteConfig);
        if self.fail_write {
            return Err(RouterError::Io(std::io::Error::other("mock write failure")));
        }
        Ok(())
    }

    async fn reload_router(&mut self) -> Result<(), RouterError> {
        self.record(RouterOp::ReloadRouter);
        if self.fail_reload {
            return Err(RouterError::Reload("mock reload failure".to_string()));
        }
        Ok(())
    }
}
