//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failures inside a run, or of worker configuration.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Clip sourcing failed: {0}")]
    Sourcing(#[from] reel_stock::StockError),

    #[error("Composition failed: {0}")]
    Media(#[from] reel_media::MediaError),

    #[error("Publishing failed: {0}")]
    Publish(#[from] reel_publish::PublishError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: reel_models::RunState,
        to: reel_models::RunState,
    },

    #[error("Invalid schedule '{expression}': {message}")]
    InvalidSchedule { expression: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_schedule(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// Reasons a run is refused before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("No valid publishing credential; authorize at {auth_url}")]
    NoCredential { auth_url: String },

    #[error("Another run is already in progress")]
    RunInProgress,
}
