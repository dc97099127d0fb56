//! Placeholder client used when no API credential is configured.

use async_trait::async_trait;

use crate::error::{AiError, Result};
use crate::llm::client::{CompletionRequest, CompletionResponse, LlmClient};

/// Fails every call with [`AiError::Configuration`] without touching the network.
///
/// Lets the server start and answer with a misconfiguration reply instead of
/// refusing to boot when the credential is absent.
#[derive(Debug, Clone)]
pub struct UnconfiguredClient {
    missing: String,
    model: String,
}

impl UnconfiguredClient {
    pub fn new(missing: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            missing: missing.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmClient for UnconfiguredClient {
    fn provider(&self) -> &str {
        "unconfigured"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        Err(AiError::Configuration(self.missing.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    #[tokio::test]
    async fn test_every_call_is_a_configuration_error() {
        let client = UnconfiguredClient::new("OPENAI_API_KEY", "gpt-4o-mini");
        let error = client.generate(vec![Message::user("hi")]).await.unwrap_err();
        assert_eq!(error, AiError::Configuration("OPENAI_API_KEY".to_string()));
        assert_eq!(client.model(), "gpt-4o-mini");
    }
}
