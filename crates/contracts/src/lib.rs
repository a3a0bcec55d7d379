//! # Contracts
//!
//! Frozen interface contracts shared by the dispatch engine and its collaborators.
//! Business crates depend only on this crate, never the reverse.
//!
//! ## Cursor model
//! - A dispatch call owns its cursor (`index`, `fail_retries`, counters)
//! - Operations see an [`Attempt`], stop predicates see a [`Progress`]
//! - The final cursor is handed back in a [`RoundReport`]

mod attempt;
mod config;
mod error;
mod hooks;
mod options;
mod round;

pub use attempt::*;
pub use config::*;
pub use error::*;
pub use hooks::*;
pub use options::*;
pub use round::*;
