//! Conversation models for per-user chat persistence.

use lara_ai::{Message, Role};
use serde::{Deserialize, Deserializer, Serialize};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::System => Role::System,
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// Single immutable unit of dialogue.
///
/// Turns are never edited; a correction is a new turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    #[serde(default = "new_turn_id")]
    pub id: String,
    pub role: TurnRole,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    /// Milliseconds since epoch. Older documents stored this as `ts`.
    #[serde(default, alias = "ts")]
    pub created_at: i64,
    /// Insertion index within the conversation, used to break timestamp ties.
    #[serde(default)]
    pub seq: u64,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>, created_at: i64, seq: u64) -> Self {
        Self {
            id: new_turn_id(),
            role,
            content: content.into(),
            created_at,
            seq,
        }
    }

    fn order_key(&self) -> (i64, u64) {
        (self.created_at, self.seq)
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message {
            role: turn.role.into(),
            content: turn.content.clone(),
        }
    }
}

fn new_turn_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Running summary of a conversation.
///
/// `cutoff` is the number of leading turns the summary supersedes and
/// `through` the id of the last of them, when known.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub text: String,
    pub cutoff: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

impl Summary {
    pub fn new(text: impl Into<String>, cutoff: usize) -> Self {
        Self {
            text: text.into(),
            cutoff,
            through: None,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Anchor the summary to the last turn it covers.
    pub fn through(mut self, turn_id: Option<String>) -> Self {
        self.through = turn_id;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A user's conversation as persisted in the document store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub user_id: String,
    #[serde(default)]
    pub messages: Vec<Turn>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub summary: String,
    #[serde(default)]
    pub summary_cutoff: usize,
    /// Id of the last turn folded into the summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_through: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_updated_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Conversation {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            user_id: user_id.into(),
            messages: Vec::new(),
            summary: String::new(),
            summary_cutoff: 0,
            summary_through: None,
            summary_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Create and append a new turn, returning a copy of it.
    ///
    /// Timestamps never go backwards within a conversation even if the wall
    /// clock does.
    pub fn append(&mut self, role: TurnRole, content: impl Into<String>) -> Turn {
        let now = chrono::Utc::now().timestamp_millis();
        let (created_at, seq) = match self.messages.last() {
            Some(last) => (now.max(last.created_at), last.seq + 1),
            None => (now, 0),
        };

        let turn = Turn::new(role, content, created_at, seq);
        self.messages.push(turn.clone());
        self.updated_at = created_at;
        turn
    }

    /// Insert an already-created turn at its ordered position.
    ///
    /// Returns `false` when a turn with the same id is already present.
    pub fn insert_turn(&mut self, turn: Turn) -> bool {
        if self.messages.iter().any(|existing| existing.id == turn.id) {
            return false;
        }

        let key = turn.order_key();
        let position = self
            .messages
            .partition_point(|existing| existing.order_key() <= key);
        self.updated_at = self.updated_at.max(turn.created_at);
        self.messages.insert(position, turn);
        true
    }

    pub fn has_summary(&self) -> bool {
        !self.summary.trim().is_empty()
    }

    /// Number of leading turns superseded by the current summary.
    ///
    /// Resolved through the anchor turn when it is present, so turns appended
    /// after the summary are never counted as covered by it.
    pub fn cutoff(&self) -> usize {
        if !self.has_summary() {
            return 0;
        }
        match self.anchor_position() {
            Some(position) => position + 1,
            None => self.summary_cutoff.min(self.messages.len()),
        }
    }

    fn anchor_position(&self) -> Option<usize> {
        let id = self.summary_through.as_deref()?;
        self.messages.iter().position(|turn| turn.id == id)
    }

    /// Pin the summary to a turn that is actually present.
    ///
    /// A stored summary can name more turns than were stored (its write
    /// succeeded while turn writes failed) or predate anchors altogether.
    /// Returns `true` when the summary bookkeeping changed.
    pub fn reconcile_summary(&mut self) -> bool {
        if !self.has_summary() {
            return false;
        }
        let cutoff = self.cutoff();
        let through = cutoff
            .checked_sub(1)
            .map(|index| self.messages[index].id.clone());
        if cutoff == self.summary_cutoff && through == self.summary_through {
            return false;
        }
        self.summary_cutoff = cutoff;
        self.summary_through = through;
        true
    }

    /// Turns not yet folded into the summary, oldest first.
    pub fn unsummarized(&self) -> &[Turn] {
        &self.messages[self.cutoff()..]
    }

    /// Replace the summary wholesale.
    pub fn replace_summary(&mut self, summary: &Summary) {
        self.summary = summary.text.clone();
        self.summary_cutoff = summary.cutoff;
        self.summary_through = summary.through.clone();
        self.summary_updated_at = Some(summary.updated_at);
        self.updated_at = self.updated_at.max(summary.updated_at);
    }

    /// Apply a freshly generated summary unless it covers fewer turns than
    /// the one already in place.
    pub fn apply_summary(&mut self, summary: &Summary) -> bool {
        if summary.is_empty() || summary.cutoff < self.cutoff() {
            return false;
        }
        self.replace_summary(summary);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_new_is_empty() {
        let conversation = Conversation::new("user-1");
        assert_eq!(conversation.user_id, "user-1");
        assert!(conversation.is_empty());
        assert!(!conversation.has_summary());
        assert_eq!(conversation.cutoff(), 0);
    }

    #[test]
    fn test_append_assigns_monotonic_order() {
        let mut conversation = Conversation::new("user-1");
        let first = conversation.append(TurnRole::User, "one");
        let second = conversation.append(TurnRole::Assistant, "two");

        assert_eq!(first.seq, 0);
        assert_eq!(second.seq, 1);
        assert!(second.created_at >= first.created_at);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_insert_turn_keeps_order_and_skips_duplicates() {
        let mut conversation = Conversation::new("user-1");
        let user = Turn::new(TurnRole::User, "question", 100, 0);
        let reply = Turn::new(TurnRole::Assistant, "answer", 100, 1);

        // The reply lands first, as a racing background write might
        assert!(conversation.insert_turn(reply.clone()));
        assert!(conversation.insert_turn(user.clone()));
        assert!(!conversation.insert_turn(user.clone()));

        let contents: Vec<&str> = conversation
            .messages
            .iter()
            .map(|turn| turn.content.as_str())
            .collect();
        assert_eq!(contents, vec!["question", "answer"]);
    }

    #[test]
    fn test_cutoff_requires_non_empty_summary() {
        let mut conversation = Conversation::new("user-1");
        conversation.append(TurnRole::User, "a");
        conversation.summary_cutoff = 1;
        assert_eq!(conversation.cutoff(), 0);

        conversation.replace_summary(&Summary::new("digest", 1));
        assert_eq!(conversation.cutoff(), 1);
        assert!(conversation.unsummarized().is_empty());
    }

    #[test]
    fn test_anchored_cutoff_ignores_later_turns() {
        let mut conversation = Conversation::new("user-1");
        let mut last = None;
        for i in 0..4 {
            last = Some(conversation.append(TurnRole::User, format!("turn {i}")).id);
        }
        conversation.replace_summary(&Summary::new("digest", 4).through(last));

        conversation.append(TurnRole::User, "fresh");
        assert_eq!(conversation.cutoff(), 4);
        assert_eq!(conversation.unsummarized()[0].content, "fresh");
    }

    #[test]
    fn test_reconcile_overreaching_summary() {
        let mut conversation = Conversation::new("user-1");
        for i in 0..4 {
            conversation.append(TurnRole::User, format!("turn {i}"));
        }
        // Covers six turns, but only four made it to the store
        conversation.replace_summary(&Summary::new("digest", 6).through(Some("lost".into())));

        assert!(conversation.reconcile_summary());
        assert_eq!(conversation.summary_cutoff, 4);
        assert_eq!(
            conversation.summary_through.as_deref(),
            Some(conversation.messages[3].id.as_str())
        );
        assert!(!conversation.reconcile_summary());

        conversation.append(TurnRole::User, "what is 2+2?");
        assert_eq!(conversation.cutoff(), 4);
        assert_eq!(conversation.unsummarized().len(), 1);
    }

    #[test]
    fn test_reconcile_without_summary_is_noop() {
        let mut conversation = Conversation::new("user-1");
        conversation.append(TurnRole::User, "a");
        conversation.summary_cutoff = 3;
        assert!(!conversation.reconcile_summary());
        assert_eq!(conversation.summary_cutoff, 3);
    }

    #[test]
    fn test_apply_summary_rejects_stale_or_empty() {
        let mut conversation = Conversation::new("user-1");
        for i in 0..4 {
            conversation.append(TurnRole::User, format!("turn {i}"));
        }

        assert!(conversation.apply_summary(&Summary::new("newer", 4)));
        assert!(!conversation.apply_summary(&Summary::new("older", 2)));
        assert!(!conversation.apply_summary(&Summary::new("   ", 4)));
        assert_eq!(conversation.summary, "newer");
    }

    #[test]
    fn test_deserialize_legacy_document() {
        let json = r#"{
            "userId": "user-1",
            "messages": [
                {"role": "user", "content": "hi", "ts": 10},
                {"role": "assistant", "content": null, "ts": 11}
            ],
            "createdAt": 1,
            "updatedAt": 2
        }"#;

        let conversation: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].created_at, 10);
        assert_eq!(conversation.messages[1].content, "");
        assert!(!conversation.messages[0].id.is_empty());
        assert_eq!(conversation.summary, "");
    }

    #[test]
    fn test_serialized_shape_uses_camel_case() {
        let mut conversation = Conversation::new("user-1");
        conversation.append(TurnRole::User, "hello");
        let value = serde_json::to_value(&conversation).unwrap();

        assert!(value.get("messages").is_some());
        assert!(value.get("summaryCutoff").is_some());
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value["messages"][0].get("createdAt").is_some());
    }
}
