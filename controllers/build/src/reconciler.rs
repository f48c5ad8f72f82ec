//! Build lifecycle reconciliation.
//!
//! `New` builds are dispatched to a worker pod; worker pod observations move
//! dispatched builds through `Running` to `Complete` or `Failed`. Both
//! terminal phases are never left.

use crate::client::{BuildUpdater, PodCreator};
use crate::error::{ControllerError, PodCreateError};
use crate::store::BuildStore;
use crate::strategy::BuildStrategy;
use crds::{Build, BuildPhase, BuildStatus, build_pod_name};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use watch_runtime::metrics::{record_build_transition, record_status_write_failure};
use watch_runtime::{Sleeper, TokioSleeper};

/// Worker pod phase as far as the build lifecycle is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    /// Not started yet (or unknown)
    Pending,
    /// At least one container running
    Running,
    /// All containers finished
    Terminated,
}

/// What the reconciler needs to know about a worker pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodObservation {
    /// Pod namespace
    pub namespace: String,
    /// Pod name
    pub name: String,
    /// Reduced phase
    pub phase: PodPhase,
    /// True when the API server reported the pod phase as `Failed`
    pub reported_failed: bool,
    /// Exit codes of terminated containers, in container order
    pub exit_codes: Vec<i32>,
}

impl PodObservation {
    /// Reduces a pod to its observation.
    pub fn from_pod(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        let raw_phase = status.and_then(|s| s.phase.as_deref()).unwrap_or("Pending");
        let phase = match raw_phase {
            "Running" => PodPhase::Running,
            "Succeeded" | "Failed" => PodPhase::Terminated,
            _ => PodPhase::Pending,
        };
        let exit_codes = status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|statuses| {
                statuses
                    .iter()
                    .filter_map(|cs| cs.state.as_ref()?.terminated.as_ref())
                    .map(|t| t.exit_code)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            namespace: pod.namespace().unwrap_or_default(),
            name: pod.name_any(),
            phase,
            reported_failed: raw_phase == "Failed",
            exit_codes,
        }
    }
}

/// Phase a dispatched build moves to given a pod observation.
///
/// A terminated pod fails the build when the pod itself failed or any
/// container exited non-zero; a pending pod leaves the phase unchanged.
pub fn next_phase(current: BuildPhase, observation: &PodObservation) -> BuildPhase {
    match observation.phase {
        PodPhase::Pending => current,
        PodPhase::Running => BuildPhase::Running,
        PodPhase::Terminated => {
            if observation.reported_failed || observation.exit_codes.iter().any(|code| *code != 0) {
                BuildPhase::Failed
            } else {
                BuildPhase::Complete
            }
        }
    }
}

/// Runs the build state machine against injected capabilities.
pub struct BuildReconciler {
    strategy: Box<dyn BuildStrategy>,
    pods: Box<dyn PodCreator>,
    updater: Box<dyn BuildUpdater>,
    store: BuildStore,
    sleeper: Arc<dyn Sleeper>,
    write_attempts: u32,
    write_retry: Duration,
    // Held from reading a build's phase until its new status is recorded.
    transitions: Mutex<()>,
}

impl BuildReconciler {
    /// Creates a reconciler with a single status write attempt.
    pub fn new(
        strategy: Box<dyn BuildStrategy>,
        pods: Box<dyn PodCreator>,
        updater: Box<dyn BuildUpdater>,
        store: BuildStore,
    ) -> Self {
        Self {
            strategy,
            pods,
            updater,
            store,
            sleeper: Arc::new(TokioSleeper),
            write_attempts: 1,
            write_retry: Duration::ZERO,
            transitions: Mutex::new(()),
        }
    }

    /// Retries failed status writes `attempts` times in total, pausing
    /// `retry` between attempts.
    pub fn with_write_retry(mut self, attempts: u32, retry: Duration) -> Self {
        self.write_attempts = attempts.max(1);
        self.write_retry = retry;
        self
    }

    /// Replaces the sleeper used between write attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Build index shared with the Build feed.
    pub fn store(&self) -> &BuildStore {
        &self.store
    }

    /// Dispatches a `New` build to a worker pod and records the outcome.
    ///
    /// Builds in any other phase are left alone, so redelivered events are
    /// harmless. The phase is read from the store when it is further along
    /// than `build`. A pod that already exists counts as dispatched.
    pub async fn handle_build(&self, build: &Build) -> Result<(), ControllerError> {
        let _guard = self.transitions.lock().await;
        let build = &self.store.current(build);
        let name = build.name_any();
        let namespace = build.namespace().unwrap_or_default();
        let current = build.phase();
        if current != BuildPhase::New {
            debug!("Build {}/{} is {}, nothing to dispatch", namespace, name, current);
            return Ok(());
        }

        let pod_id = build_pod_name(&name);
        let phase = match self.strategy.create_build_pod(build, &pod_id) {
            Err(e) => {
                warn!("Build {}/{} cannot be dispatched: {}", namespace, name, e);
                BuildPhase::Failed
            }
            Ok(pod) => match self.pods.create_pod(&namespace, &pod).await {
                Ok(()) => {
                    info!("Created worker pod {} for build {}/{}", pod_id, namespace, name);
                    BuildPhase::Pending
                }
                Err(PodCreateError::AlreadyExists) => {
                    info!(
                        "Worker pod {} for build {}/{} already exists",
                        pod_id, namespace, name
                    );
                    BuildPhase::Pending
                }
                Err(PodCreateError::Other(e)) => {
                    warn!(
                        "Failed to create worker pod {} for build {}/{}: {}",
                        pod_id, namespace, name, e
                    );
                    BuildPhase::Failed
                }
            },
        };

        let status = BuildStatus {
            phase,
            pod_id: Some(pod_id),
        };
        self.write_status(build, &status).await
    }

    /// Folds a worker pod observation into its owning build.
    ///
    /// Pods without a known owning build, and builds that are undispatched
    /// or already terminal, are ignored. Nothing is written when the phase
    /// does not change.
    pub async fn handle_pod(&self, observation: &PodObservation) -> Result<(), ControllerError> {
        let _guard = self.transitions.lock().await;
        let Some(build) = self
            .store
            .find_by_pod(&observation.namespace, &observation.name)
        else {
            debug!(
                "Pod {}/{} does not belong to a known build",
                observation.namespace, observation.name
            );
            return Ok(());
        };

        let name = build.name_any();
        let current = build.phase();
        if current == BuildPhase::New || current.is_terminal() {
            debug!(
                "Build {}/{} is {}, ignoring pod {}",
                observation.namespace, name, current, observation.name
            );
            return Ok(());
        }

        let next = next_phase(current, observation);
        if next == current {
            debug!("Build {}/{} stays {}", observation.namespace, name, current);
            return Ok(());
        }

        let status = BuildStatus {
            phase: next,
            pod_id: Some(
                build
                    .pod_id()
                    .map_or_else(|| observation.name.clone(), str::to_string),
            ),
        };
        self.write_status(&build, &status).await
    }

    /// Persists `status` and, once the write lands, records it in the store.
    async fn write_status(
        &self,
        build: &Build,
        status: &BuildStatus,
    ) -> Result<(), ControllerError> {
        let name = build.name_any();
        let namespace = build.namespace().unwrap_or_default();
        let mut attempt = 1;
        loop {
            match self.updater.update_build(&namespace, &name, status).await {
                Ok(()) => {
                    info!("Build {}/{} is now {}", namespace, name, status.phase);
                    record_build_transition(status.phase.as_str());
                    self.store.record_status(build, status);
                    return Ok(());
                }
                Err(e) if attempt < self.write_attempts => {
                    warn!(
                        "Status write for build {}/{} failed (attempt {}/{}): {}",
                        namespace, name, attempt, self.write_attempts, e
                    );
                    self.sleeper.sleep(self.write_retry).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Giving up on status write for build {}/{} after {} attempts: {}",
                        namespace, name, attempt, e
                    );
                    record_status_write_failure("build");
                    return Err(ControllerError::StatusWrite(format!(
                        "{}/{} -> {}: {}",
                        namespace, name, status.phase, e
                    )));
                }
            }
        }
    }
}
