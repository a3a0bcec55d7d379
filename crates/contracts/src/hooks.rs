//! Caller-supplied hooks: unit of work, error observer, stop predicate.
//!
//! Every hook is a small trait with a blanket impl for the matching closure
//! shape, so callers can pass either a closure or a dedicated type.

use std::future::Future;
use std::sync::Arc;

use crate::{Attempt, Progress};

/// Synchronous unit of work dispatched to one source
pub trait Operation<S, R, E> {
    /// Run against `attempt.source`
    ///
    /// # Errors
    /// Any error counts as a failure of this source.
    fn call(&mut self, attempt: &Attempt<S>) -> Result<R, E>;
}

impl<S, R, E, F> Operation<S, R, E> for F
where
    F: FnMut(&Attempt<S>) -> Result<R, E>,
{
    fn call(&mut self, attempt: &Attempt<S>) -> Result<R, E> {
        self(attempt)
    }
}

/// Asynchronous unit of work dispatched to one source
#[trait_variant::make(AsyncOperation: Send)]
pub trait LocalAsyncOperation<S, R, E> {
    /// Run against `attempt.source`
    ///
    /// # Errors
    /// Any error counts as a failure of this source.
    async fn call(&mut self, attempt: Attempt<S>) -> Result<R, E>;
}

impl<S, R, E, F, Fut> AsyncOperation<S, R, E> for F
where
    F: FnMut(Attempt<S>) -> Fut + Send,
    Fut: Future<Output = Result<R, E>> + Send,
{
    fn call(&mut self, attempt: Attempt<S>) -> impl Future<Output = Result<R, E>> + Send {
        self(attempt)
    }
}

/// Observer notified of every failed attempt, before the retry decision
pub trait ErrorObserver<S, E>: Send + Sync {
    fn on_error(&self, attempt: &Attempt<S>, error: &E);
}

impl<S, E, F> ErrorObserver<S, E> for F
where
    F: Fn(&Attempt<S>, &E) + Send + Sync,
{
    fn on_error(&self, attempt: &Attempt<S>, error: &E) {
        self(attempt, error)
    }
}

/// Shared error observer handle
pub type ErrorCallback<S, E> = Arc<dyn ErrorObserver<S, E>>;

/// Predicate asked after every pass whether the round should end
pub trait StopPredicate<S>: Send + Sync {
    fn should_stop(&self, progress: &Progress<'_, S>) -> bool;
}

impl<S, F> StopPredicate<S> for F
where
    F: Fn(&Progress<'_, S>) -> bool + Send + Sync,
{
    fn should_stop(&self, progress: &Progress<'_, S>) -> bool {
        self(progress)
    }
}
