//! Router Model
//!
//! In-memory model of a load balancer's configuration: frontends keyed by
//! service id, each with host aliases and backends of `(ip, port)`
//! endpoints. The [`Router`] trait is the capability the router controller
//! mutates; [`ConfigRouter`] persists the model as JSON and reloads the load
//! balancer by running a configured command.
//!
//! # Example
//!
//! ```no_run
//! use router_model::{ConfigRouter, Endpoint, Router};
//!
//! # async fn example() -> Result<(), router_model::RouterError> {
//! let mut router = ConfigRouter::load("/var/lib/router/routes.json", None).await?;
//! router.create_frontend("frontend", "");
//! router.add_alias("www.example.com", "frontend");
//! router.add_route("frontend", "", "", None, &[Endpoint::new("10.0.0.1", "8080")]);
//! router.write_config().await?;
//! router.reload_router().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `test-util`: exposes [`MockRouter`], which records every call.

pub mod config_router;
pub mod error;
#[cfg(feature = "test-util")]
pub mod mock;
pub mod model;
#[path = "trait.rs"]
pub mod router_trait;

pub use config_router::ConfigRouter;
pub use error::RouterError;
#[cfg(feature = "test-util")]
pub use mock::{MockRouter, RouterOp};
pub use model::{Backend, Endpoint, Frontend, FrontendTable};
pub use router_trait::Router;
