//! Supervised reconciliation loops.
//!
//! A [`ReconciliationLoop`] keeps one change feed open for the life of the
//! process. Each [`iterate`](ReconciliationLoop::iterate) opens the feed from
//! the last resource version it saw, hands every event to its
//! [`EventHandler`], and returns once the feed fails or closes. [`run`]
//! repeats that forever.
//!
//! [`run`]: ReconciliationLoop::run

use crate::backoff::{Backoff, FixedBackoff};
use crate::clock::{Sleeper, TokioSleeper};
use crate::config::WatchSettings;
use crate::error::WatchError;
use crate::event::{EventType, Selectors, WatchEvent};
use crate::metrics;
use crate::source::EventSource;
use async_trait::async_trait;
use futures::StreamExt;
use kube::Resource;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Version to open a feed from when nothing has been seen yet
pub const INITIAL_VERSION: &str = "0";

/// HTTP status the API server uses when the requested version has expired
const VERSION_EXPIRED: u16 = 410;

/// Receives decoded change notifications for one resource kind.
#[async_trait]
pub trait EventHandler<K>: Send + Sync {
    /// Error reported back to the loop, which logs it and moves on
    type Error: Display + Send;

    /// Reacts to one Added, Modified or Deleted notification.
    async fn handle(&self, event_type: EventType, object: K) -> Result<(), Self::Error>;
}

/// How one loop iteration ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The feed could not be opened; the backoff delay was taken
    OpenFailed,
    /// The feed ended normally
    Closed,
    /// The server sent an error event
    ErrorEvent,
    /// The feed broke mid-stream
    StreamFailed,
}

impl LoopOutcome {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopOutcome::OpenFailed => "open_failed",
            LoopOutcome::Closed => "closed",
            LoopOutcome::ErrorEvent => "error_event",
            LoopOutcome::StreamFailed => "stream_failed",
        }
    }
}

/// Supervises one [`EventSource`] for the life of the process.
pub struct ReconciliationLoop<S, H> {
    source: S,
    handler: H,
    selectors: Selectors,
    backoff: Box<dyn Backoff>,
    sleeper: Arc<dyn Sleeper>,
    period: Duration,
    version: String,
}

impl<S, H> ReconciliationLoop<S, H>
where
    S: EventSource,
    S::Resource: Resource,
    H: EventHandler<S::Resource>,
{
    /// Creates a loop with fixed 5s restart delay, no period, and selectors
    /// matching everything.
    pub fn new(source: S, handler: H) -> Self {
        Self {
            source,
            handler,
            selectors: Selectors::everything(),
            backoff: Box::new(FixedBackoff::default()),
            sleeper: Arc::new(TokioSleeper),
            period: Duration::ZERO,
            version: INITIAL_VERSION.to_string(),
        }
    }

    /// Applies the restart policy and period from `settings`.
    pub fn with_settings(mut self, settings: &WatchSettings) -> Self {
        self.backoff = settings.make_backoff();
        self.period = settings.period;
        self
    }

    /// Replaces the restart policy.
    pub fn with_backoff(mut self, backoff: Box<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replaces the sleeper used for every delay.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Last resource version observed; the next open resumes from here.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Event handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Runs the loop forever.
    pub async fn run(mut self) {
        info!("Starting {} watch loop", self.source.kind());
        loop {
            let outcome = self.iterate().await;
            debug!("{} watch iteration ended: {}", self.source.kind(), outcome.as_str());
            self.sleeper.sleep(self.period).await;
        }
    }

    /// Opens the feed once and consumes it until it fails or closes.
    pub async fn iterate(&mut self) -> LoopOutcome {
        let outcome = self.consume().await;
        metrics::record_watch_restart(self.source.kind(), outcome.as_str());
        outcome
    }

    async fn consume(&mut self) -> LoopOutcome {
        let kind = self.source.kind().to_string();

        let opened = self.source.watch(&self.selectors, &self.version).await;
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                let delay = self.backoff.next_delay();
                error!("Unexpected failure to watch {}: {} (retrying in {:?})", kind, e, delay);
                self.sleeper.sleep(delay).await;
                return LoopOutcome::OpenFailed;
            }
        };
        self.backoff.reset();
        debug!("Now entering {} watch mode from version {}", kind, self.version);

        while let Some(item) = stream.next().await {
            let (event_type, object) = match item {
                Ok(WatchEvent::Added(obj)) => (EventType::Added, obj),
                Ok(WatchEvent::Modified(obj)) => (EventType::Modified, obj),
                Ok(WatchEvent::Deleted(obj)) => (EventType::Deleted, obj),
                Ok(WatchEvent::Error { code, message }) => {
                    warn!("{} watch reported error {}: {}", kind, code, message);
                    if code == VERSION_EXPIRED {
                        self.version = INITIAL_VERSION.to_string();
                    }
                    return LoopOutcome::ErrorEvent;
                }
                Err(WatchError::Decode(e)) => {
                    error!("Unexpected {} object: {}", kind, e);
                    continue;
                }
                Err(e) => {
                    warn!("{} watch stream failed: {}", kind, e);
                    return LoopOutcome::StreamFailed;
                }
            };

            if let Some(version) = object.meta().resource_version.as_deref() {
                self.version = version.to_string();
            }
            metrics::record_watch_event(&kind, event_type);

            if let Err(e) = self.handler.handle(event_type, object).await {
                error!("Failed to handle {} {} event: {}", kind, event_type, e);
            }
        }

        debug!("{} watch channel closed", kind);
        LoopOutcome::Closed
    }
}
