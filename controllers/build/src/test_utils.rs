//! Test utilities for unit testing the build reconciler
//!
//! This module provides helpers for creating test data and fake capabilities
//! whose recorded calls can be inspected after being handed to a reconciler.

use crate::client::{BuildUpdater, PodCreator};
use crate::error::{ControllerError, PodCreateError};
use crate::reconciler::BuildReconciler;
use crate::store::BuildStore;
use crate::strategy::{BuildStrategy, DockerBuildStrategy};
use async_trait::async_trait;
use crds::{
    Build, BuildOutput, BuildPhase, BuildSource, BuildSpec, BuildStatus, BuildStrategyConfig,
    build_pod_name,
};
use k8s_openapi::api::core::v1::{
    ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStatus, Pod,
    PodStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::sync::{Arc, Mutex};

/// Helper to create a test Build with no status (phase New)
pub fn create_test_build(name: &str, namespace: &str) -> Build {
    Build {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: BuildSpec {
            source: BuildSource {
                git_uri: "https://github.com/example/app.git".to_string(),
                git_ref: None,
            },
            strategy: BuildStrategyConfig::default(),
            output: BuildOutput {
                image_tag: "app:latest".to_string(),
                registry: None,
            },
        },
        status: None,
    }
}

/// Sets the phase (and the derived pod id, for dispatched phases)
pub fn with_phase(mut build: Build, phase: BuildPhase) -> Build {
    let pod_id = match phase {
        BuildPhase::New => None,
        _ => Some(build_pod_name(build.metadata.name.as_deref().unwrap_or_default())),
    };
    build.status = Some(BuildStatus { phase, pod_id });
    build
}

/// Helper to create a worker pod in the given API phase.
///
/// Each exit code becomes one terminated container status; a `Running` pod
/// with no exit codes gets one running container.
pub fn create_test_pod(name: &str, namespace: &str, phase: &str, exit_codes: &[i32]) -> Pod {
    let mut container_statuses: Vec<ContainerStatus> = exit_codes
        .iter()
        .enumerate()
        .map(|(i, code)| ContainerStatus {
            name: format!("container-{i}"),
            state: Some(ContainerState {
                terminated: Some(ContainerStateTerminated {
                    exit_code: *code,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect();
    if phase == "Running" && container_statuses.is_empty() {
        container_statuses.push(ContainerStatus {
            name: "docker-build".to_string(),
            state: Some(ContainerState {
                running: Some(ContainerStateRunning::default()),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            container_statuses: Some(container_statuses),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build strategy that counts calls and can be told to fail
#[derive(Clone)]
pub struct FakeStrategy {
    inner: DockerBuildStrategy,
    fail: bool,
    calls: Arc<Mutex<usize>>,
}

impl FakeStrategy {
    pub fn new() -> Self {
        Self {
            inner: DockerBuildStrategy::new("builder:test"),
            fail: false,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl BuildStrategy for FakeStrategy {
    fn create_build_pod(&self, build: &Build, pod_name: &str) -> Result<Pod, ControllerError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(ControllerError::Strategy("unsupported source".to_string()));
        }
        self.inner.create_build_pod(build, pod_name)
    }
}

/// How [`FakePodCreator`] answers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodCreateMode {
    Succeed,
    AlreadyExists,
    Fail,
}

/// Pod creator that records every submitted pod
#[derive(Clone)]
pub struct FakePodCreator {
    mode: PodCreateMode,
    created: Arc<Mutex<Vec<Pod>>>,
}

impl FakePodCreator {
    pub fn new(mode: PodCreateMode) -> Self {
        Self {
            mode,
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn created(&self) -> Vec<Pod> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl PodCreator for FakePodCreator {
    async fn create_pod(&self, _namespace: &str, pod: &Pod) -> Result<(), PodCreateError> {
        self.created.lock().unwrap().push(pod.clone());
        match self.mode {
            PodCreateMode::Succeed => Ok(()),
            PodCreateMode::AlreadyExists => Err(PodCreateError::AlreadyExists),
            PodCreateMode::Fail => Err(PodCreateError::Other("quota exceeded".to_string())),
        }
    }
}

/// One persisted status write
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusWrite {
    pub namespace: String,
    pub name: String,
    pub status: BuildStatus,
}

/// Status updater that records writes and fails the first `n` attempts
#[derive(Clone, Default)]
pub struct RecordingUpdater {
    writes: Arc<Mutex<Vec<StatusWrite>>>,
    attempts: Arc<Mutex<usize>>,
    failures_left: Arc<Mutex<usize>>,
}

impl RecordingUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(times: usize) -> Self {
        let updater = Self::default();
        *updater.failures_left.lock().unwrap() = times;
        updater
    }

    /// Successful writes, in order
    pub fn writes(&self) -> Vec<StatusWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// All attempts, including failed ones
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn phases(&self) -> Vec<BuildPhase> {
        self.writes().iter().map(|w| w.status.phase).collect()
    }
}

#[async_trait]
impl BuildUpdater for RecordingUpdater {
    async fn update_build(
        &self,
        namespace: &str,
        name: &str,
        status: &BuildStatus,
    ) -> Result<(), ControllerError> {
        *self.attempts.lock().unwrap() += 1;
        {
            let mut failures_left = self.failures_left.lock().unwrap();
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(ControllerError::StatusWrite("conflict".to_string()));
            }
        }
        self.writes.lock().unwrap().push(StatusWrite {
            namespace: namespace.to_string(),
            name: name.to_string(),
            status: status.clone(),
        });
        Ok(())
    }
}

/// Helper to create a reconciler over fakes with an empty store
pub fn create_test_reconciler(
    strategy: &FakeStrategy,
    pods: &FakePodCreator,
    updater: &RecordingUpdater,
) -> BuildReconciler {
    BuildReconciler::new(
        Box::new(strategy.clone()),
        Box::new(pods.clone()),
        Box::new(updater.clone()),
        BuildStore::new(),
    )
}
