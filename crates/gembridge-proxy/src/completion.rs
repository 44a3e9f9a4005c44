//! Completion orchestration.
//!
//! Runs one validated request against the backend and builds the OpenAI
//! envelopes around whatever comes back:
//!
//! - [`complete_sync`] waits for the full text and wraps it in a single
//!   `chat.completion` response.
//! - [`complete_stream`] turns each backend increment into a
//!   `chat.completion.chunk` and appends one terminal chunk once the backend
//!   finishes. A backend failure mid-stream is passed through as an `Err`
//!   item and nothing follows it.
//!
//! Every envelope of a request shares one `id` and `created` timestamp.

use std::pin::Pin;

use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use gembridge_core::{BackendError, BackendRequest, ChatBackendPort, TextStream};

use crate::error::GatewayError;
use crate::models::{
    ChatChoice, ChatChunkChoice, ChatCompletionChunk, ChatCompletionRequest,
    ChatCompletionResponse, ChatDelta, ChatMessage, FINISH_STOP, OBJECT_CHUNK, OBJECT_COMPLETION,
    Usage,
};
use crate::translate::{from_backend_text, to_backend_messages};

/// Chunks of one streamed completion, in emission order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, BackendError>> + Send>>;

/// Identity shared by every envelope produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionIds {
    /// `chatcmpl-` followed by 32 hex characters.
    pub id: String,
    /// Unix timestamp (seconds) taken when the request started.
    pub created: i64,
}

impl CompletionIds {
    /// Generate a fresh id and timestamp.
    pub fn generate() -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
            created: Utc::now().timestamp(),
        }
    }
}

/// Build the backend request for a validated wire request.
fn backend_request(request: &ChatCompletionRequest) -> BackendRequest {
    BackendRequest::new(
        request.model.clone(),
        to_backend_messages(&request.messages),
        request.params(),
    )
}

/// Run a non-streaming completion.
pub async fn complete_sync(
    backend: &dyn ChatBackendPort,
    request: &ChatCompletionRequest,
) -> Result<ChatCompletionResponse, GatewayError> {
    let ids = CompletionIds::generate();
    let text = backend.complete(&backend_request(request)).await?;
    debug!(id = %ids.id, chars = text.len(), "Backend returned full response");

    Ok(ChatCompletionResponse {
        id: ids.id,
        object: OBJECT_COMPLETION.to_string(),
        created: ids.created,
        model: request.model.clone(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage::assistant(from_backend_text(text)),
            finish_reason: FINISH_STOP.to_string(),
        }],
        usage: Usage::default(),
    })
}

/// Run a streaming completion.
///
/// Fails with `GatewayError::Backend` if the backend stream cannot be opened;
/// at that point nothing has been sent to the caller yet.
pub async fn complete_stream(
    backend: &dyn ChatBackendPort,
    request: &ChatCompletionRequest,
) -> Result<ChunkStream, GatewayError> {
    let increments = backend.stream(&backend_request(request)).await?;
    let builder = ChunkBuilder {
        ids: CompletionIds::generate(),
        model: request.model.clone(),
    };
    Ok(Box::pin(chunk_stream(increments, builder)))
}

/// Builds the chunks of one streamed completion.
#[derive(Debug, Clone)]
struct ChunkBuilder {
    ids: CompletionIds,
    model: String,
}

impl ChunkBuilder {
    fn chunk(&self, delta: ChatDelta, finish_reason: Option<String>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.ids.id.clone(),
            object: OBJECT_CHUNK.to_string(),
            created: self.ids.created,
            model: self.model.clone(),
            choices: vec![ChatChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }

    fn content(&self, text: String) -> ChatCompletionChunk {
        self.chunk(
            ChatDelta {
                content: Some(from_backend_text(text)),
            },
            None,
        )
    }

    fn stop(&self) -> ChatCompletionChunk {
        self.chunk(ChatDelta::default(), Some(FINISH_STOP.to_string()))
    }
}

/// State threaded through the `unfold` stream.
struct ChunkState {
    increments: TextStream,
    builder: ChunkBuilder,
    finished: bool,
}

fn chunk_stream(
    increments: TextStream,
    builder: ChunkBuilder,
) -> impl Stream<Item = Result<ChatCompletionChunk, BackendError>> + Send {
    let state = ChunkState {
        increments,
        builder,
        finished: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }

        match st.increments.next().await {
            Some(Ok(text)) => {
                let chunk = st.builder.content(text);
                Some((Ok(chunk), st))
            }
            Some(Err(e)) => {
                warn!(id = %st.builder.ids.id, "Backend failed mid-stream: {e}");
                st.finished = true;
                Some((Err(e), st))
            }
            None => {
                st.finished = true;
                let chunk = st.builder.stop();
                Some((Ok(chunk), st))
            }
        }
    })
}
