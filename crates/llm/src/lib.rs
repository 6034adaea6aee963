//! Completion-service client
//!
//! Wraps one OpenAI-compatible chat endpoint behind the [`CompletionService`]
//! trait: a single-shot call used by the style-decision phase and a streaming
//! call used by generation jobs. The engine never talks to the wire types
//! directly.

mod client;
mod error;
mod service;
mod types;

#[cfg(test)]
mod client_tests;

pub use client::{LlmClient, DEFAULT_MODEL};
pub use error::LlmError;
pub use service::{ChunkStream, CompletionRequest, CompletionService};
