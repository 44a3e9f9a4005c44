//! Axum HTTP server for the OpenAI-compatible gateway.
//!
//! This module provides the `serve()` function that runs the gateway
//! using a pre-bound TcpListener, and `router()` for embedding or testing.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use gembridge_core::ChatBackendPort;

use crate::completion::{complete_stream, complete_sync};
use crate::error::GatewayError;
use crate::models::{ChatCompletionRequest, ModelsResponse, UnknownRolePolicy};
use crate::stream::{frame_events, sse_response};

/// Request-handling settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyConfig {
    /// What to do with messages whose role is not system/user/assistant.
    pub unknown_role: UnknownRolePolicy,
}

/// Shared application state for the gateway.
#[derive(Clone)]
struct AppState {
    /// Backend model capability.
    backend: Arc<dyn ChatBackendPort>,
    /// Request-handling settings.
    config: ProxyConfig,
}

/// Build the gateway router.
pub fn router(backend: Arc<dyn ChatBackendPort>, config: ProxyConfig) -> Router {
    let state = AppState { backend, config };

    Router::new()
        .route("/health", get(health_check))
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway with a pre-bound listener.
///
/// This function runs the Axum server until the cancellation token is triggered.
///
/// # Arguments
///
/// * `listener` - Pre-bound TCP listener
/// * `backend` - Backend model capability
/// * `config` - Request-handling settings
/// * `cancel` - Cancellation token for graceful shutdown
///
/// # Returns
///
/// Returns `Ok(())` on clean shutdown, or an error if the server fails.
pub async fn serve(
    listener: TcpListener,
    backend: Arc<dyn ChatBackendPort>,
    config: ProxyConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(
        unknown_role = %config.unknown_role,
        "Gateway starting on {addr}"
    );

    let app = router(backend, config);

    info!("Gateway listening on {addr}");
    info!("Point OpenAI clients at: http://{addr}/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Gateway shut down");
    Ok(())
}

/// Health check endpoint. Never touches the backend.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

/// Static model list in OpenAI format.
async fn list_models() -> impl IntoResponse {
    debug!("GET /v1/models");
    Json(ModelsResponse::empty())
}

/// Handle chat completions - validate, call the backend, build the response.
async fn chat_completions(State(state): State<AppState>, body: Bytes) -> Response {
    debug!("POST /v1/chat/completions");

    match handle_completion(&state, &body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn handle_completion(state: &AppState, body: &[u8]) -> Result<Response, GatewayError> {
    let request = ChatCompletionRequest::parse(body, state.config.unknown_role)?;

    info!(
        model = %request.model,
        streaming = %request.stream,
        messages = request.messages.len(),
        "Processing chat completion request"
    );

    if request.stream {
        let chunks = complete_stream(state.backend.as_ref(), &request).await?;
        Ok(sse_response(frame_events(chunks)))
    } else {
        let response = complete_sync(state.backend.as_ref(), &request).await?;
        Ok(Json(response).into_response())
    }
}
