//! Build Controller configuration, read from environment variables.

use crate::error::ControllerError;
use std::time::Duration;
use watch_runtime::WatchSettings;

/// Default number of attempts for one status write
pub const DEFAULT_STATUS_WRITE_ATTEMPTS: u32 = 3;

/// Default pause between status write attempts
pub const DEFAULT_STATUS_WRITE_RETRY: Duration = Duration::from_millis(500);

/// Build Controller settings
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Shared watch loop settings
    pub watch: WatchSettings,
    /// Builder image used unless a build overrides it (`BUILDER_IMAGE`)
    pub builder_image: String,
    /// Attempts per status write (`STATUS_WRITE_ATTEMPTS`)
    pub status_write_attempts: u32,
    /// Pause between status write attempts (`STATUS_WRITE_RETRY_MS`)
    pub status_write_retry: Duration,
}

impl BuildConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let watch = WatchSettings::from_lookup(&lookup)?;

        let builder_image = lookup("BUILDER_IMAGE")
            .filter(|image| !image.trim().is_empty())
            .ok_or_else(|| {
                ControllerError::InvalidConfig(
                    "BUILDER_IMAGE environment variable is required".to_string(),
                )
            })?;

        let status_write_attempts = match lookup("STATUS_WRITE_ATTEMPTS") {
            None => DEFAULT_STATUS_WRITE_ATTEMPTS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ControllerError::InvalidConfig(format!(
                        "STATUS_WRITE_ATTEMPTS must be a positive integer, got '{}'",
                        raw
                    )));
                }
            },
        };

        let status_write_retry = match lookup("STATUS_WRITE_RETRY_MS") {
            None => DEFAULT_STATUS_WRITE_RETRY,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| {
                    ControllerError::InvalidConfig(format!(
                        "Invalid STATUS_WRITE_RETRY_MS='{}': {}",
                        raw, e
                    ))
                })?,
        };

        Ok(Self {
            watch,
            builder_image,
            status_write_attempts,
            status_write_retry,
        })
    }
}
