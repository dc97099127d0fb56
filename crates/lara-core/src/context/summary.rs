//! Running-summary generation.

use lara_ai::{AiError, CompletionRequest, LlmClient, Message, Role};

use crate::models::Summary;

pub const SUMMARY_PROMPT: &str = include_str!("templates/summary_prompt.md");

/// Output cap for a summarization call.
pub const SUMMARY_MAX_TOKENS: u32 = 400;

/// Snapshot of the work for one summarization pass.
///
/// Captured before the completion call so turns appended while the pass is
/// in flight stay outside the new cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryJob {
    /// Summary in place when the pass started, possibly empty.
    pub previous: String,
    /// Turns since the previous cutoff, oldest first.
    pub transcript: Vec<Message>,
    /// Turn count when the pass started; becomes the new summary's cutoff.
    pub cutoff: usize,
    /// Id of the last turn when the pass started.
    pub through: Option<String>,
    pub max_bullets: usize,
}

impl SummaryJob {
    /// Messages for the summarization completion call.
    pub fn request(&self) -> Vec<Message> {
        let instruction = SUMMARY_PROMPT.replace("{max_bullets}", &self.max_bullets.to_string());

        let mut input = String::new();
        if !self.previous.is_empty() {
            input.push_str("Previous summary:\n");
            input.push_str(&self.previous);
            input.push_str("\n\nNew turns:\n\n");
        }
        input.push_str(&format_transcript(&self.transcript));

        vec![
            Message::system(instruction.trim_end()),
            Message::user(input.trim_end()),
        ]
    }

    /// Run the pass against the completion client.
    pub async fn run(&self, llm: &dyn LlmClient) -> lara_ai::Result<Summary> {
        let request = CompletionRequest::new(self.request()).with_max_tokens(SUMMARY_MAX_TOKENS);
        let response = llm.complete(request).await?;
        let text = response.content.trim();
        if text.is_empty() {
            return Err(AiError::EmptyCompletion);
        }
        Ok(Summary::new(text, self.cutoff).through(self.through.clone()))
    }
}

/// Flatten turns into a plain-text transcript.
pub fn format_transcript(messages: &[Message]) -> String {
    let mut output = String::new();
    for message in messages {
        let label = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => continue,
        };
        output.push_str(label);
        output.push_str(": ");
        output.push_str(&message.content);
        output.push_str("\n\n");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use lara_ai::{MockLlmClient, MockStep};

    fn job(previous: &str) -> SummaryJob {
        SummaryJob {
            previous: previous.to_string(),
            transcript: vec![
                Message::user("Keep answers short"),
                Message::assistant("Noted."),
            ],
            cutoff: 6,
            through: Some("turn-6".to_string()),
            max_bullets: 8,
        }
    }

    #[test]
    fn test_format_transcript_labels_roles() {
        let transcript = format_transcript(&[
            Message::system("hidden"),
            Message::user("hi"),
            Message::assistant("hello"),
        ]);
        assert_eq!(transcript, "User: hi\n\nAssistant: hello\n\n");
    }

    #[test]
    fn test_request_shape() {
        let request = job("").request();

        assert_eq!(request.len(), 2);
        assert_eq!(request[0].role, Role::System);
        assert!(request[0].content.contains("at most 8 short bullet points"));
        assert!(!request[0].content.contains("{max_bullets}"));
        assert_eq!(request[1].role, Role::User);
        assert_eq!(
            request[1].content,
            "User: Keep answers short\n\nAssistant: Noted."
        );
    }

    #[test]
    fn test_request_carries_previous_summary() {
        let request = job("- Works on Lara").request();
        assert!(request[1].content.starts_with("Previous summary:\n- Works on Lara"));
        assert!(request[1].content.contains("User: Keep answers short"));
    }

    #[tokio::test]
    async fn test_run_produces_summary_with_cutoff() {
        let llm = MockLlmClient::from_steps("mock", vec![MockStep::text("- Prefers short answers")]);

        let summary = job("").run(&llm).await.unwrap();

        assert_eq!(summary.text, "- Prefers short answers");
        assert_eq!(summary.cutoff, 6);
        assert_eq!(summary.through.as_deref(), Some("turn-6"));

        let requests = llm.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, Some(SUMMARY_MAX_TOKENS));
    }

    #[tokio::test]
    async fn test_run_propagates_failure() {
        let llm = MockLlmClient::from_steps(
            "mock",
            vec![MockStep::error(AiError::Transport("offline".to_string()))],
        );

        let error = job("").run(&llm).await.unwrap_err();
        assert_eq!(error, AiError::Transport("offline".to_string()));
    }
}
