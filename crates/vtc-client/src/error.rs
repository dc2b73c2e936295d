//! Transcode client error types.

use thiserror::Error;

/// Result type for transcode client operations.
pub type ClientResult<T> = Result<T, TranscodeError>;

/// Transport-level failures talking to the transcode worker.
///
/// A worker-reported job failure is not an error here: it is a `failed`
/// job state observed through polling.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Transcode service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request rejected by transcode service: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status code, if the worker answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TranscodeError::Http { status, .. } => Some(*status),
            TranscodeError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if the failure is likely transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranscodeError::Network(_) | TranscodeError::Timeout(_) => true,
            TranscodeError::Http { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}
