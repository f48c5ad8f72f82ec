//! Kubernetes capabilities used by the reconciler.
//!
//! The reconciler only sees the [`BuildUpdater`] and [`PodCreator`] traits;
//! the `Kube*` types implement them against the API server.

use crate::error::{ControllerError, PodCreateError};
use async_trait::async_trait;
use crds::{Build, BuildStatus};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Persists build status.
#[async_trait]
pub trait BuildUpdater: Send + Sync {
    /// Replaces `status` of the named build.
    async fn update_build(
        &self,
        namespace: &str,
        name: &str,
        status: &BuildStatus,
    ) -> Result<(), ControllerError>;
}

/// Creates worker pods.
#[async_trait]
pub trait PodCreator: Send + Sync {
    /// Submits a pod; an existing pod of the same name reports
    /// [`PodCreateError::AlreadyExists`].
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<(), PodCreateError>;
}

/// Writes build status with a merge patch on the status subresource.
#[derive(Clone)]
pub struct KubeBuildUpdater {
    client: Client,
}

impl KubeBuildUpdater {
    /// Creates an updater.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BuildUpdater for KubeBuildUpdater {
    async fn update_build(
        &self,
        namespace: &str,
        name: &str,
        status: &BuildStatus,
    ) -> Result<(), ControllerError> {
        let api: Api<Build> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        debug!("Patched status of build {}/{}", namespace, name);
        Ok(())
    }
}

/// Creates pods through the core API.
#[derive(Clone)]
pub struct KubePodCreator {
    client: Client,
}

impl KubePodCreator {
    /// Creates a pod creator.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodCreator for KubePodCreator {
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<(), PodCreateError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), pod).await?;
        debug!(
            "Created pod {}/{}",
            namespace,
            pod.metadata.name.as_deref().unwrap_or_default()
        );
        Ok(())
    }
}
