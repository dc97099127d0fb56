//! Storage layer with typed wrappers around lara-storage.
//!
//! The session talks to persistence through [`ConversationStore`], so tests
//! can swap the redb-backed implementation for an in-memory or failing one.

pub mod conversation;

use anyhow::Result;
use async_trait::async_trait;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

use crate::models::{Conversation, Summary, Turn};

pub use conversation::ConversationStorage;

/// Durable conversation store as seen by a session.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load the user's conversation, creating an empty one on first access.
    async fn load(&self, user_id: &str) -> Result<Conversation>;

    /// Append a turn. Turns already stored under the same id are ignored.
    async fn append_turn(&self, user_id: &str, turn: &Turn) -> Result<()>;

    /// Overwrite the stored summary.
    async fn replace_summary(&self, user_id: &str, summary: &Summary) -> Result<()>;
}

/// Central storage manager that initializes all storage subsystems.
pub struct Storage {
    pub conversations: ConversationStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Arc::new(Database::create(path)?);
        let conversations = ConversationStorage::new(db)?;

        Ok(Self { conversations })
    }
}
