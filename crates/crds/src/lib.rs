//! Platform CRD Definitions
//!
//! Kubernetes Custom Resource Definitions shared by the build and router
//! controllers.

pub mod build;
pub mod route;

pub use build::*;
pub use route::*;
