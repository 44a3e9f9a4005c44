//! gembridge command-line interface.
//!
//! The binary in `main.rs` is the composition root: it reads [`Cli`],
//! builds the backend adapter, and hands both to `gembridge_proxy::serve`.

pub mod config;

pub use config::Cli;
