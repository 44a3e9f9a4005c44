//! Core domain types and ports for gembridge.
//!
//! This crate holds the backend-facing side of the gateway: the internal
//! message representation the backend model understands, the generation
//! parameters, and the [`ChatBackendPort`] capability every backend adapter
//! implements. It has no HTTP or transport dependencies.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use domain::{
    BackendMessage, BackendRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, GenerationParams,
    MessageRole,
};
pub use ports::{BackendError, ChatBackendPort, TextStream};
