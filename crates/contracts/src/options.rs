//! Retry policy shared by every dispatcher of a group.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DispatchError;

/// Default consecutive failures tolerated on one source
pub const DEFAULT_FAIL_RETRIES: u32 = 3;

/// Default delay before each retry
pub const DEFAULT_FAIL_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Immutable retry policy
///
/// `fail_retries` is how many times a failing source is retried before the
/// dispatcher fails over to the next one. `fail_retry_interval` is slept before
/// every retry; zero disables the delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOptions {
    /// Retry budget per source
    #[serde(default = "default_fail_retries")]
    pub fail_retries: u32,

    /// Backoff before each retry (milliseconds on the wire)
    #[serde(
        rename = "fail_retry_interval_ms",
        with = "duration_ms",
        default = "default_fail_retry_interval"
    )]
    pub fail_retry_interval: Duration,
}

fn default_fail_retries() -> u32 {
    DEFAULT_FAIL_RETRIES
}

fn default_fail_retry_interval() -> Duration {
    DEFAULT_FAIL_RETRY_INTERVAL
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            fail_retries: DEFAULT_FAIL_RETRIES,
            fail_retry_interval: DEFAULT_FAIL_RETRY_INTERVAL,
        }
    }
}

impl DispatchOptions {
    /// Create options from a retry budget and interval
    pub fn new(fail_retries: u32, fail_retry_interval: Duration) -> Self {
        Self {
            fail_retries,
            fail_retry_interval,
        }
    }

    /// Build options from signed values as they come out of user input.
    ///
    /// # Errors
    /// Negative values are rejected, never clamped.
    pub fn try_from_signed(
        fail_retries: i64,
        fail_retry_interval_ms: i64,
    ) -> Result<Self, DispatchError> {
        let retries = u32::try_from(fail_retries).map_err(|_| {
            DispatchError::invalid_options(
                "fail_retries",
                format!("must be in 0..={}, got {fail_retries}", u32::MAX),
            )
        })?;
        let interval_ms = u64::try_from(fail_retry_interval_ms).map_err(|_| {
            DispatchError::invalid_options(
                "fail_retry_interval_ms",
                format!("must be >= 0, got {fail_retry_interval_ms}"),
            )
        })?;
        Ok(Self::new(retries, Duration::from_millis(interval_ms)))
    }

    /// Replace the retry budget
    pub fn with_fail_retries(mut self, fail_retries: u32) -> Self {
        self.fail_retries = fail_retries;
        self
    }

    /// Replace the retry interval
    pub fn with_fail_retry_interval(mut self, interval: Duration) -> Self {
        self.fail_retry_interval = interval;
        self
    }

    /// Upper bound on operation invocations in one rotation over `count` sources
    pub fn max_attempts_per_rotation(&self, count: usize) -> u64 {
        count as u64 * (u64::from(self.fail_retries) + 1)
    }

    /// Worst-case time spent sleeping in one rotation over `count` sources
    pub fn worst_case_backoff(&self, count: usize) -> Duration {
        let sleeps = count as u64 * u64::from(self.fail_retries);
        self.fail_retry_interval
            .saturating_mul(u32::try_from(sleeps).unwrap_or(u32::MAX))
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
