//! Router Controller configuration, read from environment variables.

use crate::error::ControllerError;
use std::path::PathBuf;
use watch_runtime::WatchSettings;

/// Default location of the persisted router model
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/router/routes.json";

/// Router Controller settings
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Shared watch loop settings
    pub watch: WatchSettings,
    /// Where the router model is persisted (`ROUTER_CONFIG_PATH`)
    pub config_path: PathBuf,
    /// Command run after each write (`ROUTER_RELOAD_COMMAND`)
    pub reload_command: Option<String>,
}

impl RouterConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let watch = WatchSettings::from_lookup(&lookup)?;
        let config_path = lookup("ROUTER_CONFIG_PATH")
            .filter(|path| !path.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let reload_command = lookup("ROUTER_RELOAD_COMMAND").filter(|cmd| !cmd.trim().is_empty());

        Ok(Self {
            watch,
            config_path,
            reload_command,
        })
    }
}
