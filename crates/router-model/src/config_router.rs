//! File-backed router
//!
//! Keeps the [`FrontendTable`] in memory, writes it to a JSON file and
//! reloads the load balancer by running an external command. File and
//! process I/O go through Tokio so a slow disk or reload command does not
//! stall a runtime worker.

use crate::error::RouterError;
use crate::model::{Backend, Endpoint, Frontend, FrontendTable};
use crate::router_trait::Router;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

/// Router that persists its model to a JSON file.
#[derive(Debug)]
pub struct ConfigRouter {
    table: FrontendTable,
    config_path: PathBuf,
    reload_command: Option<String>,
}

impl ConfigRouter {
    /// Creates a router with an empty model.
    ///
    /// `reload_command` is split on whitespace into a program and its
    /// arguments; `None` makes `reload_router` a no-op.
    pub fn new(config_path: impl Into<PathBuf>, reload_command: Option<String>) -> Self {
        Self {
            table: FrontendTable::new(),
            config_path: config_path.into(),
            reload_command,
        }
    }

    /// Creates a router seeded from an existing config file. A missing file
    /// yields an empty model.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn load(
        config_path: impl Into<PathBuf>,
        reload_command: Option<String>,
    ) -> Result<Self, RouterError> {
        let mut router = Self::new(config_path, reload_command);
        match fs::read(&router.config_path).await {
            Ok(bytes) => {
                router.table = serde_json::from_slice(&bytes)?;
                info!(
                    "Loaded {} frontends from {}",
                    router.table.len(),
                    router.config_path.display()
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "No router config at {}, starting empty",
                    router.config_path.display()
                );
            }
            Err(e) => return Err(e.into()),
        }
        Ok(router)
    }

    /// Current in-memory model.
    pub fn table(&self) -> &FrontendTable {
        &self.table
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.config_path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl Router for ConfigRouter {
    fn find_frontend(&self, name: &str) -> Option<&Frontend> {
        self.table.get(name)
    }

    fn create_frontend(&mut self, name: &str, url: &str) {
        self.table.ensure(name, url);
    }

    fn add_alias(&mut self, alias: &str, frontend_name: &str) {
        self.table.add_alias(alias, frontend_name);
    }

    fn delete_frontend(&mut self, name: &str) {
        self.table.remove(name);
    }

    fn delete_backends(&mut self, name: &str) {
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
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(&self.table)?;
        // Write then rename so readers never see a partial file.
        let temp = self.temp_path();
        fs::write(&temp, bytes).await?;
        fs::rename(&temp, &self.config_path).await?;
        debug!(
            "Wrote {} frontends to {}",
            self.table.len(),
            self.config_path.display()
        );
        Ok(())
    }

    async fn reload_router(&mut self) -> Result<(), RouterError> {
        let Some(command) = self.reload_command.as_deref() else {
            debug!("No reload command configured, skipping reload");
            return Ok(());
        };
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(RouterError::Reload("reload command is empty".to_string()));
        };
        let status = Command::new(program).args(parts).status().await?;
        if !status.success() {
            return Err(RouterError::Reload(format!(
                "'{command}' exited with {status}"
            )));
        }
        info!("Reloaded router with '{}'", command);
        Ok(())
    }
}
