//! LLM module - completion client abstraction

mod client;
#[cfg(any(test, feature = "test-utils"))]
mod mock_client;
mod openai;
mod unconfigured;

pub use client::{
    CompletionRequest, CompletionResponse, LlmClient, Message, Role, TokenUsage,
};
#[cfg(any(test, feature = "test-utils"))]
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
pub use openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, OpenAIClient};
pub use unconfigured::UnconfiguredClient;
