//! Publish error types.

use thiserror::Error;

/// Result type for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while publishing a video.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("No valid publishing credential")]
    NoCredential,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Publish API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the hosting service rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PublishError::NoCredential)
            || matches!(self, PublishError::Api { status: 401 | 403, .. })
    }
}
