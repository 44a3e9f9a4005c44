//! OpenAI-compatible backend (llama-server, vLLM, another gateway).
//!
//! Backend turns are sent back out as OpenAI chat messages. Streaming reads
//! `data:` events until the `[DONE]` sentinel and yields each non-empty
//! `choices[0].delta.content`.

use async_trait::async_trait;
use futures_util::{StreamExt, future};
use reqwest::Client;
use tracing::debug;

use gembridge_core::{BackendError, BackendRequest, ChatBackendPort, TextStream};

use crate::config::BackendConfig;
use crate::http::{build_client, read_json, send_checked};
use crate::sse::sse_data_stream;

/// SSE termination signal.
const DONE_SENTINEL: &str = "[DONE]";

/// `ChatBackendPort` implementation for OpenAI-compatible servers.
#[derive(Debug, Clone)]
pub struct OpenAiCompatBackend {
    client: Client,
    config: BackendConfig,
}

impl OpenAiCompatBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    fn post(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        debug!("Forwarding to {url}");
        let mut builder = self.client.post(url).json(body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

/// Build an OpenAI `/v1/chat/completions` JSON body from a backend request.
pub fn build_request_body(request: &BackendRequest, stream: bool) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = request
        .messages
        .iter()
        .map(|m| {
            serde_json::json!({
                "role": m.role().as_str(),
                "content": m.content(),
            })
        })
        .collect();

    serde_json::json!({
        "model": request.model,
        "messages": messages,
        "temperature": request.params.temperature,
        "max_tokens": request.params.max_tokens,
        "stream": stream,
    })
}

/// Extract the assistant text from a non-streaming response.
fn completion_text(response: &serde_json::Value) -> Result<String, BackendError> {
    let choice = &response["choices"][0];
    if choice.is_null() {
        return Err(BackendError::InvalidResponse(
            "response contains no choices".to_string(),
        ));
    }
    Ok(choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string())
}

/// Decode one streamed event into an increment, skipping empty ones.
fn decode_event(data: &str) -> Option<Result<String, BackendError>> {
    let chunk: serde_json::Value = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(BackendError::InvalidResponse(e.to_string()))),
    };
    match chunk["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => Some(Ok(content.to_string())),
        _ => None,
    }
}

#[async_trait]
impl ChatBackendPort for OpenAiCompatBackend {
    async fn complete(&self, request: &BackendRequest) -> Result<String, BackendError> {
        let body = build_request_body(request, false);
        let response = send_checked(self.post(&body)).await?;
        let parsed: serde_json::Value = read_json(response).await?;
        completion_text(&parsed)
    }

    async fn stream(&self, request: &BackendRequest) -> Result<TextStream, BackendError> {
        let body = build_request_body(request, true);
        let response = send_checked(self.post(&body)).await?;

        let increments = sse_data_stream(response.bytes_stream())
            .take_while(|item| {
                future::ready(!matches!(item, Ok(data) if data.trim() == DONE_SENTINEL))
            })
            .filter_map(|item| {
                future::ready(match item {
                    Ok(data) => decode_event(&data),
                    Err(e) => Some(Err(e)),
                })
            });

        Ok(Box::pin(increments))
    }
}
