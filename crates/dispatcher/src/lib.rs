//! # Dispatcher
//!
//! Sticky-failover dispatch engine.
//!
//! Responsibilities:
//! - Route an operation across an ordered list of interchangeable sources
//! - Retry a failing source with a fixed backoff, fail over once its budget is spent
//! - Stay on a healthy source for as long as it keeps answering
//! - Run continuous polling rounds in the background

pub mod dispatcher;
mod engine;
pub mod error;
pub mod handle;
pub mod metrics;

pub use contracts::{
    AsyncOperation, Attempt, Cursor, DispatchError, DispatchOptions, Dispatched, ErrorObserver,
    Operation, Progress, Round, RoundEnd, RoundReport, StopPredicate,
};
pub use dispatcher::Dispatcher;
pub use error::PollerError;
pub use handle::PollerHandle;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use tokio_util::sync::CancellationToken;
