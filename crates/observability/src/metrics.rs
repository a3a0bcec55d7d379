//! Dispatch metric recording and in-memory round statistics.

use contracts::{RoundEnd, RoundReport};
use metrics::{counter, histogram};
use std::collections::HashMap;
use std::fmt;

/// Record one operation invocation
pub fn record_attempt(dispatcher: &str) {
    counter!(
        "failover_dispatch_attempts_total",
        "dispatcher" => dispatcher.to_string()
    )
    .increment(1);
}

/// Record one failed invocation
pub fn record_failure(dispatcher: &str) {
    counter!(
        "failover_dispatch_failures_total",
        "dispatcher" => dispatcher.to_string()
    )
    .increment(1);
}

/// Record a move to the next source
pub fn record_failover(dispatcher: &str) {
    counter!(
        "failover_dispatch_failovers_total",
        "dispatcher" => dispatcher.to_string()
    )
    .increment(1);
}

/// Record a finished round
pub fn record_round(dispatcher: &str, report: &RoundReport) {
    counter!(
        "failover_dispatch_rounds_total",
        "dispatcher" => dispatcher.to_string(),
        "end" => report.end.as_str()
    )
    .increment(1);

    histogram!(
        "failover_dispatch_round_duration_ms",
        "dispatcher" => dispatcher.to_string()
    )
    .record(report.elapsed.as_secs_f64() * 1000.0);

    histogram!(
        "failover_dispatch_round_passes",
        "dispatcher" => dispatcher.to_string()
    )
    .record(report.cursor.passes as f64);
}

/// Aggregates round reports in memory for summaries
#[derive(Debug, Clone, Default)]
pub struct RoundStatsAggregator {
    pub rounds: u64,
    pub attempts: u64,
    pub failures: u64,
    pub failovers: u64,
    /// Round count per end reason
    pub ends: HashMap<RoundEnd, u64>,
    /// Round duration (ms)
    pub duration_stats: RunningStats,
    /// Passes per round
    pub pass_stats: RunningStats,
}

impl RoundStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &RoundReport) {
        self.rounds += 1;
        self.attempts += report.cursor.attempts;
        self.failures += report.cursor.failures;
        self.failovers += report.cursor.failovers;
        *self.ends.entry(report.end).or_insert(0) += 1;
        self.duration_stats
            .push(report.elapsed.as_secs_f64() * 1000.0);
        self.pass_stats.push(report.cursor.passes as f64);
    }

    pub fn summary(&self) -> RoundSummary {
        RoundSummary {
            rounds: self.rounds,
            attempts: self.attempts,
            failures: self.failures,
            failovers: self.failovers,
            failure_rate: if self.attempts > 0 {
                self.failures as f64 / self.attempts as f64 * 100.0
            } else {
                0.0
            },
            exhausted_rounds: self
                .ends
                .get(&RoundEnd::RotationExhausted)
                .copied()
                .unwrap_or(0),
            duration_ms: StatsSummary::from(&self.duration_stats),
            passes: StatsSummary::from(&self.pass_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Round statistics summary
#[derive(Debug, Clone, Default)]
pub struct RoundSummary {
    pub rounds: u64,
    pub attempts: u64,
    pub failures: u64,
    pub failovers: u64,
    /// Failed attempts, percent
    pub failure_rate: f64,
    pub exhausted_rounds: u64,
    pub duration_ms: StatsSummary,
    pub passes: StatsSummary,
}

impl fmt::Display for RoundSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Rounds: {} ({} exhausted)", self.rounds, self.exhausted_rounds)?;
        writeln!(
            f,
            "Attempts: {} / failures: {} ({:.2}%)",
            self.attempts, self.failures, self.failure_rate
        )?;
        writeln!(f, "Failovers: {}", self.failovers)?;
        writeln!(f, "Round duration (ms): {}", self.duration_ms)?;
        writeln!(f, "Passes per round: {}", self.passes)
    }
}

/// min / max / mean / std of a series
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return f.write_str("N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            (self.min, self.max, self.mean, self.m2) = (value, value, value, 0.0);
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
