//! Stock sourcing error types.

use thiserror::Error;

/// Result type for sourcing operations.
pub type StockResult<T> = Result<T, StockError>;

/// Errors that can occur while sourcing clips.
#[derive(Debug, Error)]
pub enum StockError {
    #[error("Not enough usable clips: found {found}, need {required}")]
    InsufficientClips { found: usize, required: usize },

    #[error("Stock provider request failed: {0}")]
    ProviderFailed(String),

    #[error("Clip download failed ({url}): {message}")]
    DownloadFailed { url: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StockError {
    pub fn provider_failed(msg: impl Into<String>) -> Self {
        Self::ProviderFailed(msg.into())
    }

    pub fn download_failed(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
