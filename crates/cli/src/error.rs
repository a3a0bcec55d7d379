//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// `--fail` names a source the group does not have
    #[error("Source '{source_name}' is not part of group '{group}'")]
    UnknownSource { group: String, source_name: String },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Dispatch setup or cancellation
    #[error(transparent)]
    Dispatch(#[from] contracts::DispatchError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn unknown_source(group: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self::UnknownSource {
            group: group.into(),
            source_name: source_name.into(),
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}
