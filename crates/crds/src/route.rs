//! Route CRD
//!
//! Exposes a service under an external host alias through the router.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "platform.microscaler.io",
    version = "v1alpha1",
    kind = "Route",
    namespaced,
    printcolumn = r#"{"name":"Service","type":"string","jsonPath":".spec.serviceName"}"#,
    printcolumn = r#"{"name":"Host","type":"string","jsonPath":".spec.host"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Service whose endpoints back this route; also the router frontend key
    pub service_name: String,

    /// External host alias (e.g. "www.example.com")
    pub host: String,
}

impl Route {
    /// Router frontend this route projects onto.
    pub fn service_id(&self) -> &str {
        &self.spec.service_name
    }
}
