//! Selects which part of a growing conversation is sent upstream.

use lara_ai::{Message, Role};
use serde::{Deserialize, Serialize};

use super::summary::SummaryJob;
use crate::models::{Conversation, TurnRole};

pub const DEFAULT_MAX_TURNS: usize = 30;
pub const DEFAULT_SUMMARIZE_EVERY: usize = 6;
pub const DEFAULT_SUMMARY_BULLETS: usize = 8;
pub const DEFAULT_PERSONA: &str = "You are Lara, a concise, low-cost productivity companion.";
pub const DEFAULT_GREETING: &str = "Say hi briefly.";

/// Context window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextWindowConfig {
    /// Most recent raw turns sent per request (K).
    pub max_turns: usize,
    /// Unsummarized turn count that triggers a summarization pass.
    pub summarize_every: usize,
    /// Upper bound on bullet points in a generated summary.
    pub summary_bullets: usize,
    /// Base system instruction.
    pub persona: String,
    /// User turn sent when no raw history would be forwarded.
    pub greeting: String,
}

impl Default for ContextWindowConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            summarize_every: DEFAULT_SUMMARIZE_EVERY,
            summary_bullets: DEFAULT_SUMMARY_BULLETS,
            persona: DEFAULT_PERSONA.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

/// Context window policy.
///
/// Every request starts with exactly one system message built from the
/// persona and the running summary, followed by at most `max_turns` of the
/// most recent turns not yet folded into the summary.
#[derive(Debug, Clone, Default)]
pub struct ContextWindowPolicy {
    config: ContextWindowConfig,
}

impl ContextWindowPolicy {
    pub fn new(config: ContextWindowConfig) -> Self {
        Self { config }
    }

    /// System instruction for the given summary.
    pub fn system_prompt(&self, summary: &str) -> String {
        let summary = summary.trim();
        if summary.is_empty() {
            self.config.persona.clone()
        } else {
            format!("{}\n\nSummary so far:\n{}", self.config.persona, summary)
        }
    }

    /// Build the outbound message list for a conversation.
    pub fn build_request(&self, conversation: &Conversation) -> Vec<Message> {
        let history = conversation
            .unsummarized()
            .iter()
            .filter(|turn| turn.role != TurnRole::System)
            .map(Message::from);
        self.build_messages(&conversation.summary, history)
    }

    /// Build the outbound message list from a summary and ordered history.
    ///
    /// System messages in `history` are dropped; the only system message is
    /// the one produced here.
    pub fn build_messages<I>(&self, summary: &str, history: I) -> Vec<Message>
    where
        I: IntoIterator<Item = Message>,
    {
        let history: Vec<Message> = history
            .into_iter()
            .filter(|message| message.role != Role::System)
            .collect();
        let window = self.config.max_turns.max(1);
        let start = history.len().saturating_sub(window);

        let mut messages = Vec::with_capacity(history.len() - start + 1);
        messages.push(Message::system(self.system_prompt(summary)));
        if start == history.len() {
            messages.push(Message::user(self.config.greeting.clone()));
        } else {
            messages.extend(history.into_iter().skip(start));
        }
        messages
    }

    /// Whether enough unsummarized turns have accumulated for a pass.
    pub fn should_summarize(&self, conversation: &Conversation) -> bool {
        self.is_due(conversation.len(), conversation.cutoff())
    }

    /// Pure threshold check over turn count and summary cutoff.
    pub fn is_due(&self, turn_count: usize, cutoff: usize) -> bool {
        turn_count.saturating_sub(cutoff) >= self.config.summarize_every.max(1)
    }

    /// Capture the work for a summarization pass, if one is due.
    pub fn summary_job(&self, conversation: &Conversation) -> Option<SummaryJob> {
        if !self.should_summarize(conversation) {
            return None;
        }

        let transcript = conversation
            .unsummarized()
            .iter()
            .filter(|turn| turn.role != TurnRole::System)
            .map(Message::from)
            .collect();

        Some(SummaryJob {
            previous: conversation.summary.trim().to_string(),
            transcript,
            cutoff: conversation.len(),
            through: conversation.messages.last().map(|turn| turn.id.clone()),
            max_bullets: self.config.summary_bullets,
        })
    }
}
