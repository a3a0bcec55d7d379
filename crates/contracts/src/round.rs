//! Per-call round policy and the report a finished round hands back.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::{Cursor, Progress, StopPredicate};

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundEnd {
    /// Every source was given up on during this rotation
    RotationExhausted,
    /// The stop predicate asked to end the round
    Stopped,
    /// Non-continuous round, ended after its first pass
    Single,
    /// The caller's pass cap was reached
    PassCap,
}

impl RoundEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RotationExhausted => "rotation_exhausted",
            Self::Stopped => "stopped",
            Self::Single => "single",
            Self::PassCap => "pass_cap",
        }
    }
}

impl fmt::Display for RoundEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy for one dispatch call
///
/// The default round is continuous with no stop predicate and no pass cap: it
/// keeps dispatching to a healthy source until every source is exhausted.
/// Long-lived pollers rely on that. One-shot callers use [`Round::once`], a
/// stop predicate or [`Round::max_passes`].
pub struct Round<S> {
    stop: Option<Box<dyn StopPredicate<S>>>,
    continuous: bool,
    max_passes: Option<u64>,
    pace: Duration,
}

impl<S> Default for Round<S> {
    fn default() -> Self {
        Self::continuous()
    }
}

impl<S> fmt::Debug for Round<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Round")
            .field("stop", &self.stop.as_ref().map(|_| "<predicate>"))
            .field("continuous", &self.continuous)
            .field("max_passes", &self.max_passes)
            .field("pace", &self.pace)
            .finish()
    }
}

impl<S> Round<S> {
    /// Keep passing until stopped or exhausted
    pub fn continuous() -> Self {
        Self {
            stop: None,
            continuous: true,
            max_passes: None,
            pace: Duration::ZERO,
        }
    }

    /// A single pass
    pub fn once() -> Self {
        Self {
            stop: None,
            continuous: false,
            max_passes: None,
            pace: Duration::ZERO,
        }
    }

    /// End the round once `predicate` returns true after a pass
    pub fn stop_when<F>(self, predicate: F) -> Self
    where
        F: Fn(&Progress<'_, S>) -> bool + Send + Sync + 'static,
    {
        self.stop_with(predicate)
    }

    /// Same as [`Round::stop_when`] for a dedicated predicate type
    pub fn stop_with<P>(mut self, predicate: P) -> Self
    where
        P: StopPredicate<S> + 'static,
    {
        self.stop = Some(Box::new(predicate));
        self
    }

    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    /// Cap the number of passes (`0` is treated as no cap)
    pub fn max_passes(mut self, passes: u64) -> Self {
        self.max_passes = (passes > 0).then_some(passes);
        self
    }

    /// Wait `pace` before every pass but the first
    ///
    /// Async rounds end with [`RoundEnd::Stopped`] when cancelled during this
    /// wait, without invoking the operation again.
    pub fn paced(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Delay before each pass after the first, if any
    pub fn pace(&self) -> Option<Duration> {
        (!self.pace.is_zero()).then_some(self.pace)
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn pass_cap(&self) -> Option<u64> {
        self.max_passes
    }

    pub fn has_stop_predicate(&self) -> bool {
        self.stop.is_some()
    }

    /// Decide whether the round ends after the pass described by `progress`
    pub fn end_after(&self, progress: &Progress<'_, S>) -> Option<RoundEnd> {
        if let Some(stop) = &self.stop {
            if stop.should_stop(progress) {
                return Some(RoundEnd::Stopped);
            }
        }
        if !self.continuous {
            return Some(RoundEnd::Single);
        }
        match self.max_passes {
            Some(cap) if progress.passes() >= cap => Some(RoundEnd::PassCap),
            _ => None,
        }
    }
}

/// Outcome of a finished round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    /// Cursor as the round left it
    pub cursor: Cursor,
    /// Termination reason
    pub end: RoundEnd,
    /// Wall-clock duration of the round
    pub elapsed: Duration,
}

impl RoundReport {
    /// True when the round ended because no source could be used
    pub fn exhausted(&self) -> bool {
        self.end == RoundEnd::RotationExhausted
    }
}

/// Results of a func dispatch together with its report
#[derive(Debug, Clone)]
pub struct Dispatched<R> {
    /// One value per successful pass, in pass order
    pub results: Vec<R>,
    pub report: RoundReport,
}
