//! Typed conversation storage wrapper.
//!
//! Wraps the byte-level API from lara-storage with the conversation models
//! and implements [`ConversationStore`] on top of it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redb::Database;
use std::sync::Arc;

use super::ConversationStore;
use crate::models::{Conversation, Summary, Turn};

/// Typed conversation storage wrapper around lara_storage::ConversationStorage.
#[derive(Debug, Clone)]
pub struct ConversationStorage {
    inner: lara_storage::ConversationStorage,
}

impl ConversationStorage {
    /// Create a new conversation storage instance.
    pub fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            inner: lara_storage::ConversationStorage::new(db)?,
        })
    }

    /// Get the user's conversation, creating an empty one if none exists.
    ///
    /// A summary that no longer lines up with the stored turns is re-anchored
    /// and written back before the conversation is returned.
    pub fn get_or_create(&self, user_id: &str) -> Result<Conversation> {
        let initial = serde_json::to_vec(&Conversation::new(user_id))?;
        let bytes = self.inner.get_or_insert_raw(user_id, &initial)?;
        let mut conversation = decode(user_id, &bytes)?;

        if conversation.reconcile_summary() {
            tracing::info!(
                user_id,
                cutoff = conversation.summary_cutoff,
                "Re-anchored conversation summary"
            );
            self.modify(user_id, |stored| {
                stored.reconcile_summary();
            })?;
        }
        Ok(conversation)
    }

    /// Get the user's conversation without creating it.
    pub fn get(&self, user_id: &str) -> Result<Option<Conversation>> {
        match self.inner.get_raw(user_id)? {
            Some(bytes) => Ok(Some(decode(user_id, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Insert a turn at its ordered position.
    ///
    /// Returns `false` when the turn was already stored.
    pub fn insert_turn(&self, user_id: &str, turn: &Turn) -> Result<bool> {
        let mut inserted = false;
        self.modify(user_id, |conversation| {
            inserted = conversation.insert_turn(turn.clone());
        })?;
        Ok(inserted)
    }

    /// Overwrite the summary. Last write wins.
    pub fn set_summary(&self, user_id: &str, summary: &Summary) -> Result<()> {
        self.modify(user_id, |conversation| conversation.replace_summary(summary))
    }

    /// List the ids of users with a stored conversation.
    pub fn list_users(&self) -> Result<Vec<String>> {
        self.inner.list_keys()
    }

    /// Delete the user's conversation.
    pub fn delete(&self, user_id: &str) -> Result<bool> {
        self.inner.delete(user_id)
    }

    fn modify<F>(&self, user_id: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut Conversation),
    {
        self.inner.update_raw(user_id, |current| {
            let mut conversation = match current {
                Some(bytes) => decode(user_id, &bytes)?,
                None => Conversation::new(user_id),
            };
            change(&mut conversation);
            Ok(serde_json::to_vec(&conversation)?)
        })
    }
}

fn decode(user_id: &str, bytes: &[u8]) -> Result<Conversation> {
    serde_json::from_slice(bytes)
        .with_context(|| format!("Corrupt conversation document for user {}", user_id))
}

#[async_trait]
impl ConversationStore for ConversationStorage {
    async fn load(&self, user_id: &str) -> Result<Conversation> {
        let storage = self.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || storage.get_or_create(&user_id)).await?
    }

    async fn append_turn(&self, user_id: &str, turn: &Turn) -> Result<()> {
        let storage = self.clone();
        let user_id = user_id.to_string();
        let turn = turn.clone();
        let inserted =
            tokio::task::spawn_blocking(move || storage.insert_turn(&user_id, &turn)).await??;
        if !inserted {
            tracing::debug!("Skipped duplicate turn append");
        }
        Ok(())
    }

    async fn replace_summary(&self, user_id: &str, summary: &Summary) -> Result<()> {
        let storage = self.clone();
        let user_id = user_id.to_string();
        let summary = summary.clone();
        tokio::task::spawn_blocking(move || storage.set_summary(&user_id, &summary)).await?
    }
}
