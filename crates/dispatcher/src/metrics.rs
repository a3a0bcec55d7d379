//! Dispatcher metrics for observability

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{RoundEnd, RoundReport};

/// Lifetime counters of one dispatcher, shared by all of its calls
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Operation invocations
    attempts: AtomicU64,
    /// Failed invocations
    failures: AtomicU64,
    /// Moves to the next source
    failovers: AtomicU64,
    /// Completed passes
    passes: AtomicU64,
    /// Completed rounds
    rounds: AtomicU64,
    /// Rounds that ended with every source exhausted
    exhausted_rounds: AtomicU64,
    /// Async rounds aborted by cancellation
    cancelled_rounds: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failovers(&self) -> u64 {
        self.failovers.load(Ordering::Relaxed)
    }

    pub fn inc_failovers(&self) {
        self.failovers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn inc_passes(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    pub fn exhausted_rounds(&self) -> u64 {
        self.exhausted_rounds.load(Ordering::Relaxed)
    }

    pub fn cancelled_rounds(&self) -> u64 {
        self.cancelled_rounds.load(Ordering::Relaxed)
    }

    pub fn inc_cancelled_rounds(&self) {
        self.cancelled_rounds.fetch_add(1, Ordering::Relaxed);
    }

    /// Account for a finished round
    pub fn record_round(&self, report: &RoundReport) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
        if report.end == RoundEnd::RotationExhausted {
            self.exhausted_rounds.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts(),
            failures: self.failures(),
            failovers: self.failovers(),
            passes: self.passes(),
            rounds: self.rounds(),
            exhausted_rounds: self.exhausted_rounds(),
            cancelled_rounds: self.cancelled_rounds(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub failures: u64,
    pub failovers: u64,
    pub passes: u64,
    pub rounds: u64,
    pub exhausted_rounds: u64,
    pub cancelled_rounds: u64,
}
