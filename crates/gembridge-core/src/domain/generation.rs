//! Generation parameters and the request handed to a backend.

use super::chat::BackendMessage;

/// Default sampling temperature when the caller does not specify one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default generation cap when the caller does not specify one.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Sampling parameters forwarded to the backend model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature.
    pub temperature: f64,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Everything a backend needs to produce one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    /// Model identifier, passed through verbatim from the caller.
    pub model: String,
    /// Conversation in order, oldest turn first.
    pub messages: Vec<BackendMessage>,
    /// Sampling parameters.
    pub params: GenerationParams,
}

impl BackendRequest {
    /// Create a new backend request.
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        messages: Vec<BackendMessage>,
        params: GenerationParams,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            params,
        }
    }
}
