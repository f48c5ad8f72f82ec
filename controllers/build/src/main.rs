//! Build Controller
//!
//! Turns `Build` resources into worker pods and folds the pod lifecycle
//! back into `Build.status.phase`:
//! - New builds are dispatched to a `build-<name>` pod (Pending, or Failed)
//! - Worker pod progress moves builds to Running, then Complete or Failed

mod client;
mod config;
mod controller;
mod error;
mod reconciler;
mod store;
mod strategy;
mod watcher;
#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod watcher_test;

use crate::config::BuildConfig;
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

    info!("Starting Build Controller");

    let config = BuildConfig::from_env()?;

    info!("Configuration:");
    info!("  Builder image: {}", config.builder_image);
    info!("  Namespace: {}", config.watch.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Status write attempts: {}", config.status_write_attempts);
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
