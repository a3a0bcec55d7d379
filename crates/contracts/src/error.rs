//! Layered error definitions
//!
//! Categorized by source: programming / cancellation / config

use thiserror::Error;

/// Unified error type
///
/// Operation failures never show up here: they go to the error observer and
/// are absorbed by the retry policy.
#[derive(Debug, Error)]
pub enum DispatchError {
    // ===== Programming Errors =====
    /// Dispatcher built over an empty source list
    #[error("dispatcher requires at least one source")]
    NoSources,

    /// Retry policy outside its domain
    #[error("invalid dispatch option '{field}': {message}")]
    InvalidOptions { field: String, message: String },

    // ===== Cancellation =====
    /// Async dispatch cancelled at a backoff point
    #[error("dispatch cancelled at source index {index} after {passes} passes")]
    Cancelled { index: usize, passes: u64 },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Named source group missing from configuration
    #[error("source group not found: {name}")]
    UnknownGroup { name: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Create invalid options error
    pub fn invalid_options(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create unknown group error
    pub fn unknown_group(name: impl Into<String>) -> Self {
        Self::UnknownGroup { name: name.into() }
    }

    /// True for the cancellation abort
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
