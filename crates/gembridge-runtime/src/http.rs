//! Shared HTTP plumbing for backend adapters.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, error};

use gembridge_core::BackendError;

use crate::config::BackendConfig;

/// Build the HTTP client for an adapter.
pub(crate) fn build_client(config: &BackendConfig) -> Result<Client, BackendError> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .pool_max_idle_per_host(10)
        .connect_timeout(Duration::from_secs(10));
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| BackendError::Internal(format!("Failed to create HTTP client: {e}")))
}

/// Send a request and fail on anything but a success status.
pub(crate) async fn send_checked(request: RequestBuilder) -> Result<Response, BackendError> {
    let response = request.send().await.map_err(|e| {
        error!("Failed to connect to backend: {e}");
        BackendError::Transport(e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.bytes().await.unwrap_or_default();
        let message = error_message(&body);
        error!("Backend error {status}: {message}");
        return Err(BackendError::Upstream {
            status: status.as_u16(),
            message,
        });
    }

    debug!(status = %status, "Backend accepted request");
    Ok(response)
}

/// Read and decode a JSON response body.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, BackendError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::InvalidResponse(e.to_string()))
}

/// Pull a human-readable message out of an error body.
///
/// Google and OpenAI-style services both answer with
/// `{"error": {"message": "..."}}`; anything else is returned as text.
pub(crate) fn error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(message) = value["error"]["message"].as_str() {
            return message.to_string();
        }
        if let Some(message) = value["error"].as_str() {
            return message.to_string();
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        text
    }
}
