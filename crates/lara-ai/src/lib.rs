//! Lara AI - completion client layer
//!
//! This crate provides:
//! - The `LlmClient` trait the conversation session talks to
//! - An OpenAI chat-completions client that tolerates malformed response shapes
//! - A typed failure taxonomy (`AiError`) with user-facing diagnostics
//! - A scripted mock client for tests (feature `test-utils`)

pub mod error;
mod http_client;
pub mod llm;

// Re-export commonly used types
pub use error::{AiError, ErrorClass, Result};
pub use llm::{
    CompletionRequest, CompletionResponse, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    LlmClient, Message, OpenAIClient, Role, TokenUsage, UnconfiguredClient,
};

#[cfg(any(test, feature = "test-utils"))]
pub use llm::{MockLlmClient, MockStep};
