//! Dispatcher - sticky failover across an ordered source list

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use contracts::{
    Attempt, AsyncOperation, DispatchError, DispatchOptions, Dispatched, ErrorCallback,
    ErrorObserver, Operation, Round, RoundReport,
};

use crate::engine::{RoundDriver, Step};
use crate::metrics::DispatchMetrics;

const DEFAULT_NAME: &str = "default";

/// Routes an operation across interchangeable sources
///
/// A healthy source keeps receiving calls. A failing source is retried up to
/// `fail_retries` times, `fail_retry_interval` apart, and only then does the
/// dispatcher fail over to the next source. Operation errors never reach the
/// caller: they go to the error observer, and total failure shows up as a
/// short result list or a [`RoundEnd::RotationExhausted`](contracts::RoundEnd)
/// report.
///
/// The cursor lives in each call, so one dispatcher can serve concurrent
/// callers through `&self`. Clones share sources, options, observer and
/// metrics.
pub struct Dispatcher<S, E = anyhow::Error> {
    name: Arc<str>,
    sources: Arc<[S]>,
    options: DispatchOptions,
    label: Arc<str>,
    observer: Option<ErrorCallback<S, E>>,
    metrics: Arc<DispatchMetrics>,
}

impl<S, E> Clone for Dispatcher<S, E> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            sources: Arc::clone(&self.sources),
            options: self.options,
            label: Arc::clone(&self.label),
            observer: self.observer.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<S, E> fmt::Debug for Dispatcher<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("sources", &self.label)
            .field("options", &self.options)
            .field("observer", &self.observer.as_ref().map(|_| "<observer>"))
            .finish()
    }
}

impl<S, E> Dispatcher<S, E>
where
    S: Clone + PartialEq + fmt::Display,
    E: fmt::Display,
{
    /// Create a dispatcher over `sources`, tried in the given order
    ///
    /// # Errors
    /// `DispatchError::NoSources` when `sources` is empty.
    pub fn new(
        sources: impl Into<Vec<S>>,
        options: DispatchOptions,
    ) -> Result<Self, DispatchError> {
        let sources: Vec<S> = sources.into();
        if sources.is_empty() {
            return Err(DispatchError::NoSources);
        }

        let label = distinct_label(&sources);
        debug!(sources = %label, ?options, "Dispatcher created");

        Ok(Self {
            name: Arc::from(DEFAULT_NAME),
            sources: Arc::from(sources),
            options,
            label: Arc::from(label),
            observer: None,
            metrics: Arc::new(DispatchMetrics::new()),
        })
    }

    /// Name used in logs and metric labels
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Arc::from(name.into());
        self
    }

    /// Set the error observer from a closure
    pub fn with_error_action<F>(self, action: F) -> Self
    where
        F: Fn(&Attempt<S>, &E) + Send + Sync + 'static,
        S: 'static,
        E: 'static,
    {
        self.with_error_observer(Arc::new(action))
    }

    /// Set the error observer
    pub fn with_error_observer(mut self, observer: ErrorCallback<S, E>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run a fire-and-forget round
    #[instrument(
        name = "dispatcher_dispatch_action",
        skip(self, op, round),
        fields(dispatcher = %self.name, sources = %self.label)
    )]
    pub fn dispatch_action<O>(&self, op: O, round: &Round<S>) -> RoundReport
    where
        O: Operation<S, (), E>,
    {
        self.run_round(op, round).report
    }

    /// Run a round collecting one value per successful pass
    #[instrument(
        name = "dispatcher_dispatch_func",
        skip(self, op, round),
        fields(dispatcher = %self.name, sources = %self.label)
    )]
    pub fn dispatch_func<R, O>(&self, op: O, round: &Round<S>) -> Vec<R>
    where
        O: Operation<S, R, E>,
    {
        self.run_round(op, round).results
    }

    /// Like [`Dispatcher::dispatch_func`], also returning the round report
    pub fn dispatch_func_with_report<R, O>(&self, op: O, round: &Round<S>) -> Dispatched<R>
    where
        O: Operation<S, R, E>,
    {
        self.run_round(op, round)
    }

    /// Async fire-and-forget round
    ///
    /// `cancel` is observed only while waiting: a backoff between retries
    /// aborts the call, a [`Round::paced`] wait between passes ends it as
    /// `RoundEnd::Stopped`.
    ///
    /// # Errors
    /// `DispatchError::Cancelled` when cancelled at a backoff point.
    #[instrument(
        name = "dispatcher_dispatch_action_async",
        skip(self, op, round, cancel),
        fields(dispatcher = %self.name, sources = %self.label)
    )]
    pub async fn dispatch_action_async<O>(
        &self,
        op: O,
        round: &Round<S>,
        cancel: &CancellationToken,
    ) -> Result<RoundReport, DispatchError>
    where
        O: AsyncOperation<S, (), E>,
    {
        Ok(self.run_round_async(op, round, cancel).await?.report)
    }

    /// Async round collecting one value per successful pass
    ///
    /// # Errors
    /// `DispatchError::Cancelled` when cancelled at a backoff point.
    #[instrument(
        name = "dispatcher_dispatch_func_async",
        skip(self, op, round, cancel),
        fields(dispatcher = %self.name, sources = %self.label)
    )]
    pub async fn dispatch_func_async<R, O>(
        &self,
        op: O,
        round: &Round<S>,
        cancel: &CancellationToken,
    ) -> Result<Vec<R>, DispatchError>
    where
        O: AsyncOperation<S, R, E>,
    {
        Ok(self.run_round_async(op, round, cancel).await?.results)
    }

    /// Like [`Dispatcher::dispatch_func_async`], also returning the round report
    ///
    /// # Errors
    /// `DispatchError::Cancelled` when cancelled at a backoff point.
    pub async fn dispatch_func_with_report_async<R, O>(
        &self,
        op: O,
        round: &Round<S>,
        cancel: &CancellationToken,
    ) -> Result<Dispatched<R>, DispatchError>
    where
        O: AsyncOperation<S, R, E>,
    {
        self.run_round_async(op, round, cancel).await
    }

    fn run_round<R, O>(&self, mut op: O, round: &Round<S>) -> Dispatched<R>
    where
        O: Operation<S, R, E>,
    {
        let mut driver = RoundDriver::new(self);
        let mut results = Vec::new();

        let end = loop {
            if let Some(pace) = driver.pace(round) {
                std::thread::sleep(pace);
            }
            driver.begin_pass();
            let succeeded = loop {
                let attempt = driver.begin_attempt();
                match op.call(&attempt) {
                    Ok(value) => {
                        driver.on_success(&attempt);
                        results.push(value);
                        break true;
                    }
                    Err(e) => match driver.on_failure(&attempt, &e) {
                        Step::Retry(delay) if delay.is_zero() => {}
                        Step::Retry(delay) => std::thread::sleep(delay),
                        Step::FailOver => break false,
                    },
                }
            };
            if let Some(end) = driver.finish_pass(round, succeeded) {
                break end;
            }
        };

        Dispatched {
            results,
            report: driver.finish(end),
        }
    }

    async fn run_round_async<R, O>(
        &self,
        mut op: O,
        round: &Round<S>,
        cancel: &CancellationToken,
    ) -> Result<Dispatched<R>, DispatchError>
    where
        O: AsyncOperation<S, R, E>,
    {
        let mut driver = RoundDriver::new(self);
        let mut results = Vec::new();

        let end = loop {
            if let Some(pace) = driver.pace(round) {
                let stopped = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(pace) => false,
                };
                if stopped {
                    break driver.stopped_while_pacing();
                }
            }
            driver.begin_pass();
            let succeeded = loop {
                let attempt = driver.begin_attempt();
                match op.call(attempt.clone()).await {
                    Ok(value) => {
                        driver.on_success(&attempt);
                        results.push(value);
                        break true;
                    }
                    Err(e) => match driver.on_failure(&attempt, &e) {
                        Step::Retry(delay) => {
                            if cancel.is_cancelled() {
                                return Err(driver.cancelled());
                            }
                            if !delay.is_zero() {
                                tokio::select! {
                                    biased;
                                    _ = cancel.cancelled() => return Err(driver.cancelled()),
                                    _ = tokio::time::sleep(delay) => {}
                                }
                            }
                        }
                        Step::FailOver => break false,
                    },
                }
            };
            if let Some(end) = driver.finish_pass(round, succeeded) {
                break end;
            }
        };

        Ok(Dispatched {
            results,
            report: driver.finish(end),
        })
    }
}

impl<S, E> Dispatcher<S, E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[S] {
        &self.sources
    }

    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    /// Number of sources, duplicates included
    pub fn count(&self) -> usize {
        self.sources.len()
    }

    pub fn first_source(&self) -> &S {
        &self.sources[0]
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub(crate) fn error_observer(&self) -> Option<&dyn ErrorObserver<S, E>> {
        self.observer.as_deref()
    }
}

/// Comma-joined rendered sources, first occurrence of each string kept
fn distinct_label<S: fmt::Display>(sources: &[S]) -> String {
    let mut distinct: Vec<String> = Vec::with_capacity(sources.len());
    for rendered in sources.iter().map(ToString::to_string) {
        if !distinct.contains(&rendered) {
            distinct.push(rendered);
        }
    }
    distinct.join(",")
}

impl<S, E> fmt::Display for Dispatcher<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl<S, E> PartialEq for Dispatcher<S, E> {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl<S, E> Eq for Dispatcher<S, E> {}

impl<S, E> Hash for Dispatcher<S, E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}
