//! Gemini backend over the Google Generative Language REST API.
//!
//! Turn mapping:
//!
//! | backend turn | Gemini |
//! |---|---|
//! | `System` | appended to `systemInstruction.parts` |
//! | `Human` | `{"role": "user"}` content |
//! | `Assistant` | `{"role": "model"}` content |
//!
//! Streaming uses `streamGenerateContent?alt=sse`, where every SSE event is a
//! complete `GenerateContentResponse` holding the next slice of text.
//!
//! The same wire format is served by Vertex AI. With a [`VertexTarget`]
//! configured, requests go to the project's publisher-model path and are
//! authenticated with an OAuth access token instead of an API key.

use async_trait::async_trait;
use futures_util::{StreamExt, future};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gembridge_core::{BackendError, BackendMessage, BackendRequest, ChatBackendPort, TextStream};

use crate::config::{BackendConfig, VertexTarget};
use crate::http::{build_client, read_json, send_checked};
use crate::sse::sse_data_stream;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

// =============================================================================
// Wire Types
// =============================================================================

/// Body of `generateContent` / `streamGenerateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

/// One turn (or the system instruction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A piece of content. Only text parts are produced or consumed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    /// Set on reasoning summaries; those are not part of the answer.
    #[serde(skip_serializing, default)]
    pub thought: Option<bool>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            thought: None,
        }
    }
}

/// Sampling parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

/// Response of `generateContent`, and each event of the streaming variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, or an error if the prompt was blocked.
    pub fn text(&self) -> Result<String, BackendError> {
        let Some(candidate) = self.candidates.first() else {
            if let Some(reason) = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
            {
                return Err(BackendError::Blocked(reason.to_string()));
            }
            return Ok(String::new());
        };

        let text = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect::<String>();
        Ok(text)
    }
}

/// Map backend turns onto a Gemini request body.
pub fn build_request_body(request: &BackendRequest) -> GenerateContentRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::with_capacity(request.messages.len());

    for message in &request.messages {
        match message {
            BackendMessage::System(text) => system_parts.push(Part::text(text)),
            BackendMessage::Human(text) => contents.push(Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(text)],
            }),
            BackendMessage::Assistant(text) => contents.push(Content {
                role: Some("model".to_string()),
                parts: vec![Part::text(text)],
            }),
        }
    }

    GenerateContentRequest {
        system_instruction: (!system_parts.is_empty()).then(|| Content {
            role: None,
            parts: system_parts,
        }),
        contents,
        generation_config: GenerationConfig {
            temperature: request.params.temperature,
            max_output_tokens: request.params.max_tokens,
        },
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// `ChatBackendPort` implementation for Gemini models.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    config: BackendConfig,
}

impl GeminiBackend {
    /// Create a new Gemini backend.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        if !config.has_credentials() {
            warn!("Gemini backend configured without credentials; requests will likely be rejected");
        }
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    /// `{base}/v1beta/models/{model}:{method}` (or the Vertex publisher-model
    /// path) with the model kept inside one path segment.
    fn endpoint(&self, model: &str, method: &str) -> Result<Url, BackendError> {
        if model.is_empty() || model.contains(':') {
            return Err(BackendError::InvalidRequest(format!(
                "model '{model}' is not a valid Gemini model name"
            )));
        }

        let mut url = Url::parse(self.config.base_url())
            .map_err(|e| BackendError::Internal(format!("Invalid backend URL: {e}")))?;
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| BackendError::Internal("Backend URL cannot have a path".to_string()))?;
        segments.pop_if_empty();
        match self.config.vertex() {
            Some(VertexTarget { project, location }) => {
                segments
                    .extend(["v1", "projects"])
                    .push(project)
                    .push("locations")
                    .push(location)
                    .extend(["publishers", "google", "models"]);
            }
            None => {
                segments.extend(["v1beta", "models"]);
            }
        }
        segments.push(&format!("{model}:{method}"));
        drop(segments);
        Ok(url)
    }

    fn post(&self, url: Url, body: &GenerateContentRequest) -> reqwest::RequestBuilder {
        let builder = self.client.post(url).json(body);
        match (&self.config.access_token, &self.config.api_key) {
            (Some(token), _) => builder.bearer_auth(token),
            (None, Some(key)) => builder.header(API_KEY_HEADER, key),
            (None, None) => builder,
        }
    }
}

#[async_trait]
impl ChatBackendPort for GeminiBackend {
    async fn complete(&self, request: &BackendRequest) -> Result<String, BackendError> {
        let url = self.endpoint(&request.model, "generateContent")?;
        debug!(model = %request.model, "Gemini generateContent");

        let body = build_request_body(request);
        let response = send_checked(self.post(url, &body)).await?;
        let parsed: GenerateContentResponse = read_json(response).await?;
        parsed.text()
    }

    async fn stream(&self, request: &BackendRequest) -> Result<TextStream, BackendError> {
        let mut url = self.endpoint(&request.model, "streamGenerateContent")?;
        url.set_query(Some("alt=sse"));
        debug!(model = %request.model, "Gemini streamGenerateContent");

        let body = build_request_body(request);
        let response = send_checked(self.post(url, &body)).await?;

        let increments = sse_data_stream(response.bytes_stream()).filter_map(|item| {
            future::ready(match item {
                Ok(data) => decode_event(&data),
                Err(e) => Some(Err(e)),
            })
        });

        Ok(Box::pin(increments))
    }
}

/// Decode one streamed event into an increment, skipping empty ones.
fn decode_event(data: &str) -> Option<Result<String, BackendError>> {
    let event: GenerateContentResponse = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => return Some(Err(BackendError::InvalidResponse(e.to_string()))),
    };
    match event.text() {
        Ok(text) if text.is_empty() => None,
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gembridge_core::GenerationParams;
    use serde_json::json;

    fn request(messages: Vec<BackendMessage>) -> BackendRequest {
        BackendRequest::new(
            "gemini-2.0-flash",
            messages,
            GenerationParams {
                temperature: 0.5,
                max_tokens: 256,
            },
        )
    }

    #[test]
    fn test_request_body_maps_turns() {
        let body = build_request_body(&request(vec![
            BackendMessage::System("be brief".into()),
            BackendMessage::Human("hi".into()),
            BackendMessage::Assistant("hello".into()),
            BackendMessage::Human("how are you?".into()),
        ]));

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "how are you?"}]}
                ],
                "generationConfig": {"temperature": 0.5, "maxOutputTokens": 256}
            })
        );
    }

    #[test]
    fn test_multiple_system_turns_keep_order() {
        let body = build_request_body(&request(vec![
            BackendMessage::System("first".into()),
            BackendMessage::Human("hi".into()),
            BackendMessage::System("second".into()),
        ]));

        let system = body.system_instruction.unwrap();
        let texts: Vec<_> = system.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(body.contents.len(), 1);
    }

    #[test]
    fn test_no_system_instruction_is_omitted() {
        let body = build_request_body(&request(vec![BackendMessage::Human("hi".into())]));
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "hel"},
                    {"text": "lo"}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text().unwrap(), "hello");
    }

    #[test]
    fn test_blocked_prompt_is_an_error() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(matches!(response.text(), Err(BackendError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_decode_event() {
        let event = r#"{"candidates":[{"content":{"parts":[{"text":"he"}]}}]}"#;
        assert_eq!(decode_event(event).unwrap().unwrap(), "he");

        let finish = r#"{"candidates":[{"content":{"parts":[{"text":""}]},"finishReason":"STOP"}]}"#;
        assert!(decode_event(finish).is_none());

        assert!(matches!(
            decode_event("not json"),
            Some(Err(BackendError::InvalidResponse(_)))
        ));
    }

    fn local_backend() -> GeminiBackend {
        GeminiBackend::new(BackendConfig::new("http://localhost:9000/")).unwrap()
    }

    #[test]
    fn test_endpoint_format() {
        let url = local_backend()
            .endpoint("gemini-2.0-flash", "generateContent")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let backend = GeminiBackend::new(BackendConfig::new("http://localhost:9000/proxy")).unwrap();
        let url = backend.endpoint("gemini-pro", "generateContent").unwrap();
        assert_eq!(url.path(), "/proxy/v1beta/models/gemini-pro:generateContent");
    }

    #[test]
    fn test_endpoint_model_cannot_leave_models_path() {
        let backend = local_backend();

        let url = backend
            .endpoint("../../v1/tunedModels/x", "generateContent")
            .unwrap();
        assert!(url.path().starts_with("/v1beta/models/"), "{url}");
        assert_eq!(url.path_segments().unwrap().count(), 3, "{url}");
        assert!(url.path().ends_with(":generateContent"));

        for model in ["gemini-pro#frag", "gemini-pro?key=other", "a b%2F"] {
            let url = backend.endpoint(model, "generateContent").unwrap();
            assert!(url.path().starts_with("/v1beta/models/"), "{url}");
            assert_eq!(url.path_segments().unwrap().count(), 3, "{url}");
            assert!(url.path().ends_with(":generateContent"), "{url}");
            assert!(url.fragment().is_none(), "{url}");
            assert!(url.query().is_none(), "{url}");
        }
    }

    #[test]
    fn test_vertex_endpoint() {
        let target = VertexTarget::new("my-project", "us-central1");
        let config = BackendConfig::new(target.default_base_url()).with_vertex(target);
        let backend = GeminiBackend::new(config).unwrap();

        let url = backend.endpoint("gemini-1.5-pro", "generateContent").unwrap();
        assert_eq!(
            url.as_str(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/my-project/locations/us-central1/publishers/google/models/gemini-1.5-pro:generateContent"
        );

        let url = backend.endpoint("../other/x", "generateContent").unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 9, "{url}");
    }

    #[test]
    fn test_endpoint_rejects_method_override() {
        let backend = local_backend();
        for model in ["gemini-pro:countTokens#", "gemini-pro:countTokens", ""] {
            assert!(matches!(
                backend.endpoint(model, "generateContent"),
                Err(BackendError::InvalidRequest(_))
            ));
        }
    }
}
