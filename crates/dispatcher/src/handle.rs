//! PollerHandle - runs a continuous dispatch round on a background task

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use contracts::{AsyncOperation, DispatchError, Round, RoundReport};

use crate::dispatcher::Dispatcher;
use crate::error::PollerError;
use crate::metrics::DispatchMetrics;

/// Handle to a running poller
///
/// The poller keeps dispatching to the current healthy source every `period`
/// until shut down or until every source is exhausted.
pub struct PollerHandle {
    /// Dispatcher name
    name: String,
    /// Shared metrics of the polled dispatcher
    metrics: Arc<DispatchMetrics>,
    /// Ends the round
    cancel: CancellationToken,
    /// Worker task handle
    worker: JoinHandle<Result<RoundReport, DispatchError>>,
}

impl PollerHandle {
    /// Spawn a poller for `dispatcher`
    pub fn spawn<S, E, O>(dispatcher: Dispatcher<S, E>, op: O, period: Duration) -> Self
    where
        S: Clone + PartialEq + fmt::Display + Send + Sync + 'static,
        E: fmt::Display + Send + Sync + 'static,
        O: AsyncOperation<S, (), E> + 'static,
    {
        let name = dispatcher.name().to_string();
        let metrics = Arc::clone(dispatcher.metrics());
        let cancel = CancellationToken::new();

        let worker_cancel = cancel.clone();
        let worker = tokio::spawn(async move {
            poll_worker(dispatcher, op, period, worker_cancel).await
        });

        Self {
            name,
            metrics,
            cancel,
            worker,
        }
    }

    /// Get dispatcher name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// True once the round ended on its own (all sources exhausted)
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Stop polling and wait for the worker
    ///
    /// Returns `None` when the stop landed on a backoff and aborted the round.
    #[instrument(name = "poller_handle_shutdown", skip(self), fields(poller = %self.name))]
    pub async fn shutdown(self) -> Result<Option<RoundReport>, PollerError> {
        self.cancel.cancel();
        let report = self.join().await;
        debug!("PollerHandle shutdown complete");
        report
    }

    /// Wait for the round to end without requesting a stop
    pub async fn join(self) -> Result<Option<RoundReport>, PollerError> {
        match self.worker.await {
            Ok(Ok(report)) => Ok(Some(report)),
            Ok(Err(e)) if e.is_cancelled() => Ok(None),
            Ok(Err(e)) => Err(PollerError::dispatch(self.name, e)),
            Err(e) => {
                error!(poller = %self.name, error = ?e, "Poller task panicked");
                Err(PollerError::join(self.name, e))
            }
        }
    }
}

/// Worker task driving one continuous round
#[instrument(
    name = "poller_worker_loop",
    skip(dispatcher, op, cancel),
    fields(poller = %dispatcher.name())
)]
async fn poll_worker<S, E, O>(
    dispatcher: Dispatcher<S, E>,
    op: O,
    period: Duration,
    cancel: CancellationToken,
) -> Result<RoundReport, DispatchError>
where
    S: Clone + PartialEq + fmt::Display + Send + Sync,
    E: fmt::Display + Send + Sync,
    O: AsyncOperation<S, (), E>,
{
    info!(sources = %dispatcher, ?period, "Poller started");

    let stop = cancel.clone();
    let round = Round::continuous()
        .paced(period)
        .stop_when(move |_| stop.is_cancelled());

    let result = dispatcher.dispatch_action_async(op, &round, &cancel).await;
    match &result {
        Ok(report) => info!(
            end = %report.end,
            passes = report.cursor.passes,
            index = report.cursor.index,
            "Poller stopped"
        ),
        Err(e) => debug!(error = %e, "Poller aborted"),
    }
    result
}
