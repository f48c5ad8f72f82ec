//! Watch settings shared by every controller binary.
//!
//! Values come from environment variables; [`WatchSettings::from_lookup`]
//! takes any key lookup so parsing can be tested without touching the
//! process environment.

use crate::backoff::{Backoff, DEFAULT_RETRY_DELAY, FibonacciBackoff, FixedBackoff};
use crate::error::WatchError;
use std::net::SocketAddr;
use std::time::Duration;

/// Default address of the probe/metrics server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

/// Restart policy selector (`WATCH_BACKOFF`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffKind {
    /// Same delay every time
    #[default]
    Fixed,
    /// Fibonacci growth from the retry delay up to the max delay
    Fibonacci,
}

/// Loop supervision settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    /// Namespace to watch (`WATCH_NAMESPACE`, unset means all namespaces)
    pub namespace: Option<String>,
    /// Delay between loop iterations (`WATCH_PERIOD_SECS`)
    pub period: Duration,
    /// Delay after a failed open (`WATCH_RETRY_SECS`)
    pub retry_delay: Duration,
    /// Restart policy (`WATCH_BACKOFF`)
    pub backoff: BackoffKind,
    /// Cap for the Fibonacci policy (`WATCH_BACKOFF_MAX_SECS`)
    pub max_retry_delay: Duration,
    /// Probe/metrics listen address (`METRICS_ADDR`)
    pub metrics_addr: SocketAddr,
}

impl WatchSettings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, WatchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());
        let period = Duration::from_secs(parse_secs(&lookup, "WATCH_PERIOD_SECS", 0)?);
        let retry_delay = Duration::from_secs(parse_secs(
            &lookup,
            "WATCH_RETRY_SECS",
            DEFAULT_RETRY_DELAY.as_secs(),
        )?);
        let max_retry_delay =
            Duration::from_secs(parse_secs(&lookup, "WATCH_BACKOFF_MAX_SECS", 60)?);

        let backoff = match lookup("WATCH_BACKOFF").as_deref().map(str::trim) {
            None | Some("") | Some("fixed") => BackoffKind::Fixed,
            Some("fibonacci") => BackoffKind::Fibonacci,
            Some(other) => {
                return Err(WatchError::Config(format!(
                    "WATCH_BACKOFF must be 'fixed' or 'fibonacci', got '{}'",
                    other
                )));
            }
        };

        let metrics_addr = lookup("METRICS_ADDR")
            .unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| WatchError::Config(format!("Invalid METRICS_ADDR: {}", e)))?;

        Ok(Self {
            namespace,
            period,
            retry_delay,
            backoff,
            max_retry_delay,
            metrics_addr,
        })
    }

    /// Builds a fresh restart policy; each loop owns its own.
    pub fn make_backoff(&self) -> Box<dyn Backoff> {
        match self.backoff {
            BackoffKind::Fixed => Box::new(FixedBackoff::new(self.retry_delay)),
            BackoffKind::Fibonacci => {
                Box::new(FibonacciBackoff::new(self.retry_delay, self.max_retry_delay))
            }
        }
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<u64, WatchError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| WatchError::Config(format!("Invalid {}='{}': {}", key, raw, e))),
    }
}
