//! OpenAI-compatible chat completion gateway.
//!
//! Accepts `/v1/chat/completions` requests in OpenAI format, hands the
//! conversation to a [`gembridge_core::ChatBackendPort`], and answers with
//! OpenAI-shaped JSON or an SSE chunk stream.
//!
//! - [`models`] - wire schema and request validation
//! - [`translate`] - wire message ↔ backend turn mapping
//! - [`completion`] - synchronous and streaming orchestration
//! - [`stream`] - SSE framing and termination
//! - [`error`] - error → HTTP status mapping
//! - [`server`] - Axum router and `serve()`

#![deny(unsafe_code)]

pub mod completion;
pub mod error;
pub mod models;
pub mod server;
pub mod stream;
pub mod translate;

pub use error::GatewayError;
pub use models::UnknownRolePolicy;
pub use server::{ProxyConfig, router, serve};
