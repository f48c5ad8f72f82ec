//! Prometheus metrics for the platform controllers.
//!
//! All metrics carry the `platform_controller_` prefix and live in
//! [`METRICS_REGISTRY`], which the probe server exposes on `/metrics`. A
//! metric that fails to register is logged and left unrecorded; it never
//! takes the controller down.

use crate::event::EventType;
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use tracing::warn;

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "platform_controller";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// A counter family that is `None` when it could not be registered
pub type LazyCounterVec = LazyLock<Option<CounterVec>>;

fn register_counter_vec(name: &str, help: &str, labels: &[&str]) -> Option<CounterVec> {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    CounterVec::new(opts, labels)
        .and_then(|counter| {
            METRICS_REGISTRY.register(Box::new(counter.clone()))?;
            Ok(counter)
        })
        .inspect_err(|e| warn!("Metric {} is disabled: {}", name, e))
        .ok()
}

fn inc(counter: &LazyCounterVec, labels: &[&str]) {
    if let Some(counter) = LazyLock::force(counter) {
        counter.with_label_values(labels).inc();
    }
}

/// Change notifications handled, by resource kind and event type
pub static WATCH_EVENTS_TOTAL: LazyCounterVec = LazyLock::new(|| {
    register_counter_vec(
        "watch_events_total",
        "Change notifications handled by resource and event type",
        &["resource", "event"],
    )
});

/// Watch loop iterations that ended, by resource kind and outcome
pub static WATCH_RESTARTS_TOTAL: LazyCounterVec = LazyLock::new(|| {
    register_counter_vec(
        "watch_restarts_total",
        "Watch loop restarts by resource and outcome",
        &["resource", "outcome"],
    )
});

/// Build phase transitions written, by target phase
pub static BUILD_TRANSITIONS_TOTAL: LazyCounterVec = LazyLock::new(|| {
    register_counter_vec(
        "build_transitions_total",
        "Build phase transitions by target phase",
        &["phase"],
    )
});

/// Status writes dropped after exhausting retries
pub static STATUS_WRITE_FAILURES_TOTAL: LazyCounterVec = LazyLock::new(|| {
    register_counter_vec(
        "status_write_failures_total",
        "Status writes dropped after retries by resource",
        &["resource"],
    )
});

/// Router sync operations, by source kind and event type
pub static ROUTER_SYNCS_TOTAL: LazyCounterVec = LazyLock::new(|| {
    register_counter_vec(
        "router_syncs_total",
        "Router sync operations by source kind and event type",
        &["kind", "event"],
    )
});

/// Router config writes or reloads that failed
pub static ROUTER_PERSIST_FAILURES_TOTAL: LazyCounterVec = LazyLock::new(|| {
    register_counter_vec(
        "router_persist_failures_total",
        "Router config write or reload failures by stage",
        &["stage"],
    )
});

/// Count one handled change notification.
pub fn record_watch_event(resource: &str, event: EventType) {
    inc(&WATCH_EVENTS_TOTAL, &[resource, event.as_str()]);
}

/// Count one finished loop iteration.
pub fn record_watch_restart(resource: &str, outcome: &str) {
    inc(&WATCH_RESTARTS_TOTAL, &[resource, outcome]);
}

/// Count one persisted build phase transition.
pub fn record_build_transition(phase: &str) {
    inc(&BUILD_TRANSITIONS_TOTAL, &[phase]);
}

/// Count one dropped status write.
pub fn record_status_write_failure(resource: &str) {
    inc(&STATUS_WRITE_FAILURES_TOTAL, &[resource]);
}

/// Count one router sync.
pub fn record_router_sync(kind: &str, event: EventType) {
    inc(&ROUTER_SYNCS_TOTAL, &[kind, event.as_str()]);
}

/// Count one failed router write (`stage = "write"`) or reload (`stage = "reload"`).
pub fn record_router_persist_failure(stage: &str) {
    inc(&ROUTER_PERSIST_FAILURES_TOTAL, &[stage]);
}

/// Renders the registry in Prometheus text format.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&METRICS_REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
