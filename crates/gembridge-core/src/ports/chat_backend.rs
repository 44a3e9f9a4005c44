//! Chat backend port.
//!
//! This port is the single capability the gateway depends on: given an
//! ordered list of backend turns and generation parameters, produce either
//! the full response text or a lazy sequence of text increments. It hides
//! which model service sits behind it and how it is reached.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use thiserror::Error;

use crate::domain::BackendRequest;

/// Lazy, finite, non-restartable sequence of text increments.
///
/// The stream ends (`None`) once the backend has finished generating. An
/// `Err` item means generation failed part-way; consumers stop polling after
/// the first error.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, BackendError>> + Send>>;

/// Errors that can occur while talking to a backend model.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached, or the connection broke mid-response.
    #[error("Backend transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The backend answered, but the payload could not be understood.
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// The backend refused to generate for this prompt.
    #[error("Prompt blocked by backend: {0}")]
    Blocked(String),

    /// The request cannot be expressed in the backend's protocol.
    #[error("Invalid backend request: {0}")]
    InvalidRequest(String),

    /// Internal error inside the adapter.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Returns a suggested HTTP status code for this error.
    ///
    /// Every backend failure surfaces as a generic server error on the
    /// OpenAI-compatible surface.
    #[must_use]
    pub const fn suggested_status_code(&self) -> u16 {
        500
    }

    /// Returns true if this error indicates a temporary condition
    /// where retrying may succeed. The gateway itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidRequest(_)
            | Self::InvalidResponse(_)
            | Self::Blocked(_)
            | Self::Internal(_) => false,
        }
    }
}

/// Port for generating chat completions with a backend model.
///
/// Implementations handle:
/// - Mapping backend turns onto the model service's own message format
/// - Authentication against the model service
/// - Decoding full and incremental responses into plain text
#[async_trait]
pub trait ChatBackendPort: Send + Sync + fmt::Debug {
    /// Generate the complete response text for a request.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be reached or fails.
    async fn complete(&self, request: &BackendRequest) -> Result<String, BackendError>;

    /// Start incremental generation for a request.
    ///
    /// The returned stream yields text increments in generation order.
    /// Dropping the stream releases the underlying backend handle.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the stream cannot be opened. Failures after
    /// the stream is open are reported as `Err` items.
    async fn stream(&self, request: &BackendRequest) -> Result<TextStream, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_map_to_server_error() {
        let errors = [
            BackendError::Transport("refused".into()),
            BackendError::Upstream {
                status: 400,
                message: "bad".into(),
            },
            BackendError::InvalidRequest("bad model".into()),
            BackendError::InvalidResponse("not json".into()),
            BackendError::Blocked("SAFETY".into()),
            BackendError::Internal("oops".into()),
        ];
        for err in errors {
            assert_eq!(err.suggested_status_code(), 500);
        }
    }

    #[test]
    fn test_retryable() {
        assert!(BackendError::Transport("reset".into()).is_retryable());
        assert!(
            BackendError::Upstream {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            BackendError::Upstream {
                status: 429,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !BackendError::Upstream {
                status: 404,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!BackendError::Blocked("SAFETY".into()).is_retryable());
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = BackendError::Upstream {
            status: 403,
            message: "permission denied".into(),
        };
        assert_eq!(err.to_string(), "Backend returned 403: permission denied");
    }
}
