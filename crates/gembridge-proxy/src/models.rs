//! OpenAI API data models for request/response handling.
//!
//! This module is the contract layer: it defines the wire schema of the
//! `/v1/chat/completions`, `/v1/models` and `/health` endpoints and validates
//! inbound requests before anything reaches the backend. Domain types live in
//! `gembridge-core`; this module handles the API layer mapping.

use std::fmt;
use std::str::FromStr;

use gembridge_core::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, GenerationParams, MessageRole};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Object kind of a non-streaming completion.
pub const OBJECT_COMPLETION: &str = "chat.completion";

/// Object kind of a streaming completion chunk.
pub const OBJECT_CHUNK: &str = "chat.completion.chunk";

/// Finish reason attached to every completed response.
pub const FINISH_STOP: &str = "stop";

// =============================================================================
// Validation
// =============================================================================

/// A request body that does not match the wire schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SchemaError(pub String);

/// What to do with a message whose role is not system/user/assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownRolePolicy {
    /// Fail validation with a `SchemaError`.
    #[default]
    Reject,
    /// Remove the message and keep going.
    Drop,
}

impl UnknownRolePolicy {
    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Drop => "drop",
        }
    }
}

impl fmt::Display for UnknownRolePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnknownRolePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "drop" => Ok(Self::Drop),
            other => Err(format!(
                "unknown role policy '{other}' (expected 'reject' or 'drop')"
            )),
        }
    }
}

// =============================================================================
// Chat Completion Request/Response Types
// =============================================================================

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user" or "assistant".
    pub role: MessageRole,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a new message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Message as it arrives on the wire, before the role is checked.
#[derive(Debug, Deserialize)]
struct RawMessage {
    role: String,
    content: String,
}

/// Request body as it arrives on the wire, before defaults are applied.
///
/// `null` for an optional field is treated the same as the field being absent.
#[derive(Debug, Deserialize)]
struct RawRequest {
    model: String,
    messages: Vec<RawMessage>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    stream: Option<bool>,
}

/// Validated request to the /v1/chat/completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletionRequest {
    /// Model name, passed through to the backend unchecked.
    pub model: String,
    /// Conversation in order; never empty.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate; always positive.
    pub max_tokens: u32,
    /// Whether to stream the response.
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Deserialize and validate a raw request body.
    ///
    /// Missing optional fields get their defaults (`temperature` 0.7,
    /// `max_tokens` 1000, `stream` false). Messages with a role outside
    /// `system`/`user`/`assistant` are handled according to `policy`.
    pub fn parse(body: &[u8], policy: UnknownRolePolicy) -> Result<Self, SchemaError> {
        let raw: RawRequest = serde_json::from_slice(body)
            .map_err(|e| SchemaError(format!("Invalid request body: {e}")))?;

        let mut messages = Vec::with_capacity(raw.messages.len());
        for (index, message) in raw.messages.into_iter().enumerate() {
            match MessageRole::parse(&message.role) {
                Some(role) => messages.push(ChatMessage::new(role, message.content)),
                None => match policy {
                    UnknownRolePolicy::Reject => {
                        return Err(SchemaError(format!(
                            "messages[{index}].role: unsupported role '{}' (expected 'system', 'user' or 'assistant')",
                            message.role
                        )));
                    }
                    UnknownRolePolicy::Drop => {
                        warn!(index, role = %message.role, "Dropping message with unsupported role");
                    }
                },
            }
        }

        if messages.is_empty() {
            return Err(SchemaError("messages: at least one message is required".to_string()));
        }

        let max_tokens = raw.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(SchemaError("max_tokens: must be a positive integer".to_string()));
        }

        Ok(Self {
            model: raw.model,
            messages,
            temperature: raw.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens,
            stream: raw.stream.unwrap_or(false),
        })
    }

    /// Sampling parameters for the backend.
    pub const fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Response from /v1/chat/completions endpoint (non-streaming).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

/// A single chat completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// Streaming chunk from /v1/chat/completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChunkChoice>,
}

impl ChatCompletionChunk {
    /// Whether this chunk closes the stream of content.
    pub fn is_terminal(&self) -> bool {
        self.choices.iter().any(|c| c.finish_reason.is_some())
    }
}

/// A single streaming choice.
///
/// `finish_reason` is serialized as `null` until the final chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunkChoice {
    pub index: u32,
    pub delta: ChatDelta,
    pub finish_reason: Option<String>,
}

/// Delta content in streaming response. Empty on the final chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDelta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
}

/// Token usage statistics.
///
/// No accounting is performed; the gateway always reports zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// =============================================================================
// Models Endpoint Types
// =============================================================================

/// Response from /v1/models endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelsResponse {
    /// The model list is a static stub: no registry is consulted.
    pub fn empty() -> Self {
        Self {
            object: "list".to_string(),
            data: Vec::new(),
        }
    }
}

/// Information about a single model (OpenAI format).
///
/// Element type of [`ModelsResponse::data`], which the gateway always leaves
/// empty; it keeps the list typed for clients that deserialize it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

// =============================================================================
// Error Response Types
// =============================================================================

/// Error body: `{"detail": "<message>"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: &serde_json::Value) -> Result<ChatCompletionRequest, SchemaError> {
        ChatCompletionRequest::parse(value.to_string().as_bytes(), UnknownRolePolicy::Reject)
    }

    #[test]
    fn test_defaults_applied() {
        let req = parse(&json!({
            "model": "m1",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        assert_eq!(req.model, "m1");
        assert_eq!(req.messages, vec![ChatMessage::new(MessageRole::User, "hi")]);
        assert!((req.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(req.max_tokens, 1000);
        assert!(!req.stream);
    }

    #[test]
    fn test_explicit_fields_and_nulls() {
        let req = parse(&json!({
            "model": "m1",
            "messages": [{"role": "system", "content": "s"}, {"role": "user", "content": "u"}],
            "temperature": 0.1,
            "max_tokens": null,
            "stream": true
        }))
        .unwrap();

        assert!((req.temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(req.max_tokens, 1000);
        assert!(req.stream);
        assert_eq!(req.params().max_tokens, 1000);
    }

    #[test]
    fn test_model_is_opaque() {
        let req = parse(&json!({
            "model": "anything/goes:here@v2",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        assert_eq!(req.model, "anything/goes:here@v2");
    }

    #[test]
    fn test_missing_messages_rejected() {
        let err = parse(&json!({"model": "m1"})).unwrap_err();
        assert!(err.0.contains("messages"), "{err}");
    }

    #[test]
    fn test_empty_messages_rejected() {
        let err = parse(&json!({"model": "m1", "messages": []})).unwrap_err();
        assert!(err.0.contains("at least one message"));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        assert!(parse(&json!({"model": "m1", "messages": "hi"})).is_err());
        assert!(
            parse(&json!({
                "model": "m1",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": "lots"
            }))
            .is_err()
        );
        assert!(
            parse(&json!({
                "model": "m1",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": "yes"
            }))
            .is_err()
        );
        assert!(parse(&json!({"model": 42, "messages": [{"role": "user", "content": "hi"}]})).is_err());
    }

    #[test]
    fn test_non_positive_max_tokens_rejected() {
        assert!(
            parse(&json!({
                "model": "m1",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 0
            }))
            .is_err()
        );
        assert!(
            parse(&json!({
                "model": "m1",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": -5
            }))
            .is_err()
        );
    }

    #[test]
    fn test_unknown_role_rejected_by_default() {
        let err = parse(&json!({
            "model": "m1",
            "messages": [{"role": "user", "content": "hi"}, {"role": "tool", "content": "x"}]
        }))
        .unwrap_err();
        assert!(err.0.contains("messages[1].role"));
        assert!(err.0.contains("'tool'"));
    }

    #[test]
    fn test_unknown_role_dropped_under_drop_policy() {
        let body = json!({
            "model": "m1",
            "messages": [
                {"role": "system", "content": "s"},
                {"role": "function", "content": "f"},
                {"role": "user", "content": "u"}
            ]
        })
        .to_string();

        let req = ChatCompletionRequest::parse(body.as_bytes(), UnknownRolePolicy::Drop).unwrap();
        assert_eq!(
            req.messages,
            vec![
                ChatMessage::new(MessageRole::System, "s"),
                ChatMessage::new(MessageRole::User, "u"),
            ]
        );
    }

    #[test]
    fn test_all_dropped_is_empty() {
        let body = json!({
            "model": "m1",
            "messages": [{"role": "tool", "content": "x"}]
        })
        .to_string();
        assert!(ChatCompletionRequest::parse(body.as_bytes(), UnknownRolePolicy::Drop).is_err());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("reject".parse(), Ok(UnknownRolePolicy::Reject));
        assert_eq!("DROP".parse(), Ok(UnknownRolePolicy::Drop));
        assert!("ignore".parse::<UnknownRolePolicy>().is_err());
        assert_eq!(UnknownRolePolicy::default(), UnknownRolePolicy::Reject);
    }

    #[test]
    fn test_chunk_serialization_shape() {
        let content = ChatCompletionChunk {
            id: "chatcmpl-1".into(),
            object: OBJECT_CHUNK.into(),
            created: 0,
            model: "m1".into(),
            choices: vec![ChatChunkChoice {
                index: 0,
                delta: ChatDelta {
                    content: Some("he".into()),
                },
                finish_reason: None,
            }],
        };
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["choices"][0]["delta"], json!({"content": "he"}));
        assert!(value["choices"][0]["finish_reason"].is_null());
        assert!(value["choices"][0].as_object().unwrap().contains_key("finish_reason"));
        assert!(!content.is_terminal());

        let mut terminal = content;
        terminal.choices[0].delta = ChatDelta::default();
        terminal.choices[0].finish_reason = Some(FINISH_STOP.into());
        let value = serde_json::to_value(&terminal).unwrap();
        assert_eq!(value["choices"][0]["delta"], json!({}));
        assert_eq!(value["choices"][0]["finish_reason"], "stop");
        assert!(terminal.is_terminal());
    }

    #[test]
    fn test_models_response_is_empty_list() {
        let value = serde_json::to_value(ModelsResponse::empty()).unwrap();
        assert_eq!(value, json!({"object": "list", "data": []}));
    }

    #[test]
    fn test_model_info_matches_openai_list_entries() {
        let list: ModelsResponse = serde_json::from_value(json!({
            "object": "list",
            "data": [{"id": "gemini-pro", "object": "model", "created": 0, "owned_by": "google"}]
        }))
        .unwrap();
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].id, "gemini-pro");
        assert_eq!(list.data[0].owned_by, "google");
    }
}
