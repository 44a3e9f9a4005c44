//! Backend adapters for gembridge.
//!
//! Each adapter implements [`gembridge_core::ChatBackendPort`] over HTTP:
//!
//! - [`GeminiBackend`] talks to the Google Generative Language API.
//! - [`OpenAiCompatBackend`] talks to any OpenAI-compatible server
//!   (llama-server, vLLM, another gateway).
//!
//! Both share the SSE decoder in [`sse`] for incremental responses.

#![deny(unsafe_code)]

mod config;
pub mod gemini;
mod http;
pub mod openai;
pub mod sse;

pub use config::{BackendConfig, BackendKind, VertexTarget};
pub use gemini::GeminiBackend;
pub use openai::OpenAiCompatBackend;

use std::sync::Arc;

use gembridge_core::{BackendError, ChatBackendPort};

/// Build the backend adapter selected by `kind`.
pub fn build_backend(
    kind: BackendKind,
    config: BackendConfig,
) -> Result<Arc<dyn ChatBackendPort>, BackendError> {
    let backend: Arc<dyn ChatBackendPort> = match kind {
        BackendKind::Gemini => Arc::new(GeminiBackend::new(config)?),
        BackendKind::OpenAi => Arc::new(OpenAiCompatBackend::new(config)?),
    };
    Ok(backend)
}
