//! Poller error types

use thiserror::Error;

use contracts::DispatchError;

/// Errors surfaced when a background poller is joined
#[derive(Debug, Error)]
pub enum PollerError {
    /// The dispatch round ended with an error
    #[error("poller '{name}' dispatch error: {source}")]
    Dispatch {
        name: String,
        #[source]
        source: DispatchError,
    },

    /// The worker task panicked or was aborted
    #[error("poller '{name}' worker failed: {source}")]
    Join {
        name: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl PollerError {
    pub fn dispatch(name: impl Into<String>, source: DispatchError) -> Self {
        Self::Dispatch {
            name: name.into(),
            source,
        }
    }

    pub fn join(name: impl Into<String>, source: tokio::task::JoinError) -> Self {
        Self::Join {
            name: name.into(),
            source,
        }
    }
}
