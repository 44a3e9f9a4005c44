//! SSE framing for streamed completions.
//!
//! Each chunk becomes one event, followed by the `[DONE]` sentinel once the
//! terminal chunk has been sent:
//!
//! ```text
//! data: {"id":"chatcmpl-…","choices":[{"delta":{"content":"he"},…}]}\n\n
//! data: {"id":"chatcmpl-…","choices":[{"delta":{},"finish_reason":"stop",…}]}\n\n
//! data: [DONE]\n\n
//! ```
//!
//! Framer states:
//!
//! ```text
//! Streaming ──chunk──▶ Streaming
//! Streaming ──terminal chunk──▶ Terminal ──[DONE]──▶ Done ──▶ (closed)
//! Streaming ──backend error──▶ Aborted ──▶ (closed, no [DONE])
//! ```
//!
//! An aborted stream yields an `Err` to the transport, which closes the
//! connection abnormally. No explicit error event is sent; callers detect
//! the failure by the missing sentinel.

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use gembridge_core::BackendError;

use crate::completion::ChunkStream;
use crate::models::ChatCompletionChunk;

/// Final event of every successful stream.
pub const DONE_EVENT: &str = "data: [DONE]\n\n";

/// Where the framer is in the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramerState {
    /// Forwarding content chunks.
    Streaming,
    /// Terminal chunk sent; sentinel still owed.
    Terminal,
    /// Sentinel sent.
    Done,
    /// Backend failed before the terminal chunk.
    Aborted,
}

/// Encode one chunk as an SSE event.
pub fn encode_event(chunk: &ChatCompletionChunk) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(chunk)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

/// Convert a chunk stream into SSE body bytes.
pub fn frame_events(
    chunks: ChunkStream,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
    futures_util::stream::unfold(
        (chunks, FramerState::Streaming),
        |(mut chunks, state)| async move {
            match state {
                FramerState::Streaming => match chunks.next().await {
                    Some(Ok(chunk)) => {
                        let next = if chunk.is_terminal() {
                            FramerState::Terminal
                        } else {
                            FramerState::Streaming
                        };
                        match encode_event(&chunk) {
                            Ok(event) => Some((Ok(event), (chunks, next))),
                            Err(e) => {
                                warn!("Failed to encode chunk: {e}");
                                let err = std::io::Error::other(e);
                                Some((Err(err), (chunks, FramerState::Aborted)))
                            }
                        }
                    }
                    Some(Err(e)) => Some((Err(abort(e)), (chunks, FramerState::Aborted))),
                    None => {
                        warn!("Chunk stream ended without a terminal chunk");
                        let err = std::io::Error::other("stream ended before completion");
                        Some((Err(err), (chunks, FramerState::Aborted)))
                    }
                },
                FramerState::Terminal => {
                    debug!("Stream complete");
                    let event = Bytes::from_static(DONE_EVENT.as_bytes());
                    Some((Ok(event), (chunks, FramerState::Done)))
                }
                FramerState::Done | FramerState::Aborted => None,
            }
        },
    )
}

fn abort(e: BackendError) -> std::io::Error {
    warn!("Aborting stream: {e}");
    std::io::Error::other(e)
}

/// Wrap framed SSE bytes in a streaming HTTP response.
pub fn sse_response<S>(events: S) -> Response
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
{
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .header("cache-control", "no-cache")
        .header("x-accel-buffering", "no") // Disable nginx buffering
        .body(Body::from_stream(events))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
