//! Watch Runtime
//!
//! Level-triggered watch supervision shared by the build and router
//! controllers.
//!
//! An [`EventSource`] opens a change feed on one resource collection. A
//! [`ReconciliationLoop`] owns one source, hands every change to an
//! [`EventHandler`], and reopens the feed from the last seen resource version
//! whenever it fails or closes. Delays between attempts come from a
//! [`Backoff`] policy and are taken through a [`Sleeper`], so tests can drive
//! the loop without real time passing.
//!
//! # Features
//!
//! - `test-util`: exposes [`RecordingSleeper`] and [`ScriptedSource`] for
//!   unit tests in dependent crates.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod probes;
pub mod source;
pub mod supervisor;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use backoff::{Backoff, FibonacciBackoff, FixedBackoff};
pub use clock::{Sleeper, TokioSleeper};
#[cfg(any(test, feature = "test-util"))]
pub use clock::RecordingSleeper;
pub use config::{BackoffKind, WatchSettings};
pub use error::WatchError;
pub use event::{EventType, Selectors, WatchEvent};
pub use source::{EventSource, EventStream, KubeEventSource};
pub use supervisor::{EventHandler, LoopOutcome, ReconciliationLoop};
#[cfg(any(test, feature = "test-util"))]
pub use testing::ScriptedSource;
