//! Core domain types.
//!
//! These types represent what the backend model sees, independent of the
//! OpenAI-style wire format the proxy exposes.
//!
//! # Structure
//!
//! - `chat` - Message roles and backend turn types
//! - `generation` - Sampling parameters and the full backend request

mod chat;
mod generation;

pub use chat::{BackendMessage, MessageRole};
pub use generation::{BackendRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, GenerationParams};
