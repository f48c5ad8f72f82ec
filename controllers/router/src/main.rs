//! Router Controller
//!
//! Keeps a load balancer's frontends in step with the cluster:
//! - `Route` resources add host aliases to the frontend of their service
//! - `Endpoints` replace the frontend's backends with the ready addresses
//!
//! After every change the router model is written to disk and the load
//! balancer is reloaded.

mod config;
mod controller;
mod endpoints;
mod error;
mod reconciler;
mod watcher;

use crate::config::RouterConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Configure rustls crypto provider (use ring for compatibility)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        info!("rustls crypto provider already installed");
    }

    info!("Starting Router Controller");

    let config = RouterConfig::from_env()?;

    info!("Configuration:");
    info!("  Config path: {}", config.config_path.display());
    info!("  Reload command: {}", config.reload_command.as_deref().unwrap_or("none"));
    info!("  Namespace: {}", config.watch.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Probe address: {}", config.watch.metrics_addr);

    let metrics_addr = config.watch.metrics_addr;
    tokio::spawn(async move {
        if let Err(e) = watch_runtime::probes::serve_probes(metrics_addr).await {
            error!("Probe server failed: {}", e);
        }
    });

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
