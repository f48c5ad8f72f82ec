//! Build CRD
//!
//! Requests a container image build. The build controller turns each new
//! `Build` into a worker pod and folds the pod lifecycle back into
//! `status.phase`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "platform.microscaler.io",
    version = "v1alpha1",
    kind = "Build",
    namespaced,
    status = "BuildStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Pod","type":"string","jsonPath":".status.podId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    /// Where the build context comes from
    pub source: BuildSource,

    /// How the image is built
    #[serde(default)]
    pub strategy: BuildStrategyConfig,

    /// Where the resulting image is pushed
    pub output: BuildOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildSource {
    /// Git repository URI
    pub git_uri: String,

    /// Branch, tag or commit (defaults to the repository HEAD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildStrategyConfig {
    /// Strategy type
    #[serde(rename = "type", default)]
    pub strategy_type: BuildStrategyType,

    /// Overrides the controller's default builder image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_image: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum BuildStrategyType {
    /// Dockerfile build inside a privileged builder container
    #[default]
    #[serde(alias = "docker")]
    Docker,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    /// Image tag to produce (e.g. "myapp:latest")
    pub image_tag: String,

    /// Registry to push to (no push when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    /// Lifecycle phase
    #[serde(default)]
    pub phase: BuildPhase,

    /// Name of the worker pod, assigned once at dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_id: Option<String>,
}

/// Build lifecycle phase
///
/// Serializes as PascalCase ("Pending", "Complete", etc.) and also accepts
/// lowercase on input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum BuildPhase {
    /// Not yet dispatched
    #[default]
    #[serde(alias = "new")]
    New,

    /// Worker pod created, not yet running
    #[serde(alias = "pending")]
    Pending,

    /// Worker pod running
    #[serde(alias = "running")]
    Running,

    /// Worker pod finished with every container exiting 0
    #[serde(alias = "complete")]
    Complete,

    /// Dispatch failed or a container exited non-zero
    #[serde(alias = "failed")]
    Failed,
}

impl BuildPhase {
    /// Complete and Failed are never left once reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildPhase::Complete | BuildPhase::Failed)
    }

    /// Name as serialized in `status.phase`
    pub fn as_str(self) -> &'static str {
        match self {
            BuildPhase::New => "New",
            BuildPhase::Pending => "Pending",
            BuildPhase::Running => "Running",
            BuildPhase::Complete => "Complete",
            BuildPhase::Failed => "Failed",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Build {
    /// Current phase; a build without status is `New`.
    pub fn phase(&self) -> BuildPhase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    /// Worker pod name, once dispatched.
    pub fn pod_id(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.pod_id.as_deref())
    }
}

/// Derives the worker pod name for a build.
pub fn build_pod_name(build_name: &str) -> String {
    format!("build-{build_name}")
}
