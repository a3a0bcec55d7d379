//! Attempt-with-retry core and round loop, shared by the sync and async paths.
//!
//! `RoundDriver` owns the cursor of one call. The two execution paths only
//! differ in how they invoke the operation and how they wait out a backoff;
//! every cursor transition lives here.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use contracts::{Attempt, Cursor, DispatchError, Progress, Round, RoundEnd, RoundReport};

use crate::dispatcher::Dispatcher;

/// What the core does after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Wait, then retry the same source
    Retry(Duration),
    /// Budget exhausted, cursor moved on, pass over
    FailOver,
}

pub(crate) struct RoundDriver<'d, S, E> {
    dispatcher: &'d Dispatcher<S, E>,
    cursor: Cursor,
    successes: usize,
    started: Instant,
}

impl<'d, S, E> RoundDriver<'d, S, E>
where
    S: Clone + PartialEq + fmt::Display,
    E: fmt::Display,
{
    pub(crate) fn new(dispatcher: &'d Dispatcher<S, E>) -> Self {
        Self {
            dispatcher,
            cursor: Cursor::default(),
            successes: 0,
            started: Instant::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Delay owed before the next pass; none before the first
    pub(crate) fn pace(&self, round: &Round<S>) -> Option<Duration> {
        if self.cursor.passes == 0 {
            return None;
        }
        round.pace()
    }

    /// Log a round that was stopped while waiting for its next pass
    pub(crate) fn stopped_while_pacing(&self) -> RoundEnd {
        debug!(
            dispatcher = %self.dispatcher.name(),
            index = self.cursor.index,
            passes = self.cursor.passes,
            "Round stopped between passes"
        );
        RoundEnd::Stopped
    }

    /// Start a pass at the current index
    pub(crate) fn begin_pass(&mut self) {
        self.cursor.fail_retries = 0;
    }

    /// Build the attempt for the current cursor position
    pub(crate) fn begin_attempt(&mut self) -> Attempt<S> {
        let sources = self.dispatcher.sources();
        debug_assert!(self.cursor.index < sources.len());

        self.cursor.attempts += 1;
        self.dispatcher.metrics().inc_attempts();
        observability::metrics::record_attempt(self.dispatcher.name());

        Attempt {
            index: self.cursor.index,
            source: sources[self.cursor.index].clone(),
            retry: self.cursor.fail_retries,
            pass: self.cursor.passes + 1,
        }
    }

    /// The source answered; stay on it
    pub(crate) fn on_success(&mut self, attempt: &Attempt<S>) {
        if attempt.is_retry() {
            debug!(
                dispatcher = %self.dispatcher.name(),
                source = %attempt.source,
                retries = attempt.retry,
                "Source recovered"
            );
        }
        self.cursor.fail_retries = 0;
        self.successes += 1;
    }

    /// Report the failure and decide between retry and failover
    pub(crate) fn on_failure(&mut self, attempt: &Attempt<S>, error: &E) -> Step {
        self.cursor.failures += 1;
        self.dispatcher.metrics().inc_failures();
        observability::metrics::record_failure(self.dispatcher.name());

        warn!(
            dispatcher = %self.dispatcher.name(),
            source = %attempt.source,
            index = attempt.index,
            retry = attempt.retry,
            error = %error,
            "Dispatch attempt failed"
        );

        if let Some(observer) = self.dispatcher.error_observer() {
            observer.on_error(attempt, error);
        }

        let options = self.dispatcher.options();
        if self.cursor.fail_retries < options.fail_retries {
            self.cursor.fail_retries += 1;
            return Step::Retry(options.fail_retry_interval);
        }

        self.cursor.index += 1;
        self.cursor.fail_retries = 0;
        self.cursor.failovers += 1;
        self.dispatcher.metrics().inc_failovers();
        observability::metrics::record_failover(self.dispatcher.name());

        match self.dispatcher.sources().get(self.cursor.index) {
            Some(next) => info!(
                dispatcher = %self.dispatcher.name(),
                from = %attempt.source,
                to = %next,
                "Retry budget exhausted, failing over"
            ),
            None => info!(
                dispatcher = %self.dispatcher.name(),
                from = %attempt.source,
                "Retry budget exhausted on last source"
            ),
        }
        Step::FailOver
    }

    /// Close the pass and decide whether the round ends
    pub(crate) fn finish_pass(&mut self, round: &Round<S>, succeeded: bool) -> Option<RoundEnd> {
        self.cursor.passes += 1;
        self.dispatcher.metrics().inc_passes();

        let count = self.dispatcher.count();
        if self.cursor.rotation_exhausted(count) {
            self.cursor.fail_retries = 0;
            return Some(RoundEnd::RotationExhausted);
        }
        self.cursor.fail_retries = 0;

        let progress = Progress::new(
            self.dispatcher.sources(),
            self.cursor,
            self.successes,
            succeeded,
        );
        round.end_after(&progress)
    }

    pub(crate) fn cancelled(&self) -> DispatchError {
        self.dispatcher.metrics().inc_cancelled_rounds();
        debug!(
            dispatcher = %self.dispatcher.name(),
            index = self.cursor.index,
            passes = self.cursor.passes,
            "Dispatch cancelled during backoff"
        );
        DispatchError::Cancelled {
            index: self.cursor.index,
            passes: self.cursor.passes,
        }
    }

    pub(crate) fn finish(self, end: RoundEnd) -> RoundReport {
        let report = RoundReport {
            cursor: self.cursor,
            end,
            elapsed: self.started.elapsed(),
        };
        self.dispatcher.metrics().record_round(&report);
        observability::metrics::record_round(self.dispatcher.name(), &report);

        debug!(
            dispatcher = %self.dispatcher.name(),
            end = %end,
            index = report.cursor.index,
            passes = report.cursor.passes,
            failures = report.cursor.failures,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Round finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DispatchOptions;

    fn dispatcher(fail_retries: u32) -> Dispatcher<&'static str, String> {
        Dispatcher::new(
            vec!["a", "b"],
            DispatchOptions::new(fail_retries, Duration::from_millis(5)),
        )
        .unwrap()
    }

    #[test]
    fn test_failure_retries_then_fails_over() {
        let dispatcher = dispatcher(1);
        let mut driver = RoundDriver::new(&dispatcher);
        driver.begin_pass();

        let attempt = driver.begin_attempt();
        assert_eq!(attempt.source, "a");
        assert_eq!(
            driver.on_failure(&attempt, &"boom".to_string()),
            Step::Retry(Duration::from_millis(5))
        );
        assert_eq!(driver.cursor().fail_retries, 1);

        let attempt = driver.begin_attempt();
        assert_eq!(attempt.source, "a");
        assert!(attempt.is_retry());
        assert_eq!(driver.on_failure(&attempt, &"boom".to_string()), Step::FailOver);

        let cursor = driver.cursor();
        assert_eq!(cursor.index, 1);
        assert_eq!(cursor.fail_retries, 0);
        assert_eq!(cursor.failovers, 1);
        assert_eq!(cursor.attempts, 2);
    }

    #[test]
    fn test_finish_pass_detects_rotation_exhaustion() {
        let dispatcher = dispatcher(0);
        let mut driver = RoundDriver::new(&dispatcher);
        let round = Round::continuous();

        for _ in 0..2 {
            driver.begin_pass();
            let attempt = driver.begin_attempt();
            assert_eq!(driver.on_failure(&attempt, &"down".to_string()), Step::FailOver);
            let end = driver.finish_pass(&round, false);
            if driver.cursor().index == 2 {
                assert_eq!(end, Some(RoundEnd::RotationExhausted));
            } else {
                assert_eq!(end, None);
            }
        }

        let report = driver.finish(RoundEnd::RotationExhausted);
        assert_eq!(report.cursor.passes, 2);
        assert_eq!(dispatcher.metrics().snapshot().exhausted_rounds, 1);
    }

    #[test]
    fn test_success_keeps_index() {
        let dispatcher = dispatcher(3);
        let mut driver = RoundDriver::new(&dispatcher);
        driver.begin_pass();
        let attempt = driver.begin_attempt();
        driver.on_success(&attempt);
        assert_eq!(driver.finish_pass(&Round::once(), true), Some(RoundEnd::Single));
        assert_eq!(driver.cursor().index, 0);
    }

    #[test]
    fn test_pace_skips_first_pass() {
        let dispatcher = dispatcher(0);
        let round = Round::continuous().paced(Duration::from_millis(20));
        let mut driver = RoundDriver::new(&dispatcher);
        assert_eq!(driver.pace(&round), None);

        driver.begin_pass();
        let attempt = driver.begin_attempt();
        driver.on_success(&attempt);
        assert_eq!(driver.finish_pass(&round, true), None);
        assert_eq!(driver.pace(&round), Some(Duration::from_millis(20)));
        assert_eq!(driver.pace(&Round::continuous()), None);
    }
}
