//! Gateway error type and its HTTP mapping.
//!
//! | error | status | body |
//! |---|---|---|
//! | `Schema` | 400 | `{"detail": "<validation message>"}` |
//! | `Backend` | 500 | `{"detail": "<backend error text>"}` |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gembridge_core::BackendError;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::{ErrorResponse, SchemaError};

/// Everything that can go wrong while serving a completion.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request body did not match the wire schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The backend failed before the response was committed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Schema(_) => StatusCode::BAD_REQUEST,
            Self::Backend(e) => StatusCode::from_u16(e.suggested_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Schema(e) => warn!("Rejected request: {e}"),
            Self::Backend(e) => error!("Backend call failed: {e}"),
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
