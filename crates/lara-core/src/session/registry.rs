//! Per-user sessions for the multi-client server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dashmap::DashMap;
use tokio::task::JoinHandle;

use super::conversation::{ConversationSession, SessionServices};

/// Sessions keyed by user id, opened lazily on first use.
pub struct SessionRegistry {
    services: SessionServices,
    sessions: DashMap<String, Arc<ConversationSession>>,
}

impl SessionRegistry {
    pub fn new(services: SessionServices) -> Self {
        Self {
            services,
            sessions: DashMap::new(),
        }
    }

    pub fn services(&self) -> &SessionServices {
        &self.services
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<ConversationSession>> {
        self.sessions.get(user_id).map(|entry| entry.value().clone())
    }

    /// Return the user's session, opening it from storage if needed.
    pub async fn get_or_open(&self, user_id: &str) -> Result<Arc<ConversationSession>> {
        if let Some(session) = self.get(user_id) {
            session.touch();
            return Ok(session);
        }

        let opened = Arc::new(ConversationSession::open(user_id, self.services.clone()).await?);
        // Two first requests may race; the first insert wins
        let session = self
            .sessions
            .entry(user_id.to_string())
            .or_insert(opened)
            .value()
            .clone();
        Ok(session)
    }

    /// Flush and drop the user's session. Returns `false` if none was open.
    pub async fn close(&self, user_id: &str) -> bool {
        let Some((_, session)) = self.sessions.remove(user_id) else {
            return false;
        };
        session.flush().await;
        tracing::info!(user_id, "Closed conversation session");
        true
    }

    /// Flush and drop sessions unused for at least `max_idle`.
    ///
    /// Sessions with a reply or summary in flight are kept. Returns the
    /// number of sessions dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let candidates: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_idle(max_idle))
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for user_id in candidates {
            let Some((_, session)) = self
                .sessions
                .remove_if(&user_id, |_, session| session.is_idle(max_idle))
            else {
                continue;
            };
            session.flush().await;
            tracing::debug!(user_id = %user_id, "Evicted idle conversation session");
            evicted += 1;
        }
        evicted
    }

    /// Periodically evict sessions idle for longer than `max_idle`.
    pub fn spawn_idle_sweeper(
        self: Arc<Self>,
        max_idle: Duration,
        every: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = self.evict_idle(max_idle).await;
                if evicted > 0 {
                    tracing::info!(evicted, remaining = self.len(), "Swept idle sessions");
                }
            }
        })
    }

    /// Flush every open session.
    pub async fn flush_all(&self) {
        let sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for session in sessions {
            session.flush().await;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextWindowPolicy;
    use crate::storage::ConversationStorage;
    use lara_ai::{MockLlmClient, MockStep};
    use redb::Database;
    use tempfile::TempDir;

    fn registry(llm: MockLlmClient) -> (SessionRegistry, Arc<ConversationStorage>, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let storage = Arc::new(ConversationStorage::new(db).unwrap());
        let services = SessionServices {
            llm: Arc::new(llm),
            store: storage.clone(),
            policy: Arc::new(ContextWindowPolicy::default()),
        };
        (SessionRegistry::new(services), storage, temp_dir)
    }

    #[tokio::test]
    async fn test_get_or_open_reuses_session() {
        let (registry, _storage, _temp_dir) = registry(MockLlmClient::new("mock"));

        let first = registry.get_or_open("user-1").await.unwrap();
        let second = registry.get_or_open("user-1").await.unwrap();
        let other = registry.get_or_open("user-2").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_close_flushes_and_removes() {
        let llm = MockLlmClient::from_steps("mock", vec![MockStep::text("reply")]);
        let (registry, storage, _temp_dir) = registry(llm);

        let session = registry.get_or_open("user-1").await.unwrap();
        session.submit("hello").await.unwrap();

        assert!(registry.close("user-1").await);
        assert!(!registry.close("user-1").await);
        assert!(registry.is_empty());
        assert_eq!(storage.get("user-1").unwrap().unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn test_evict_idle_flushes_and_keeps_recent() {
        let llm = MockLlmClient::from_steps("mock", vec![MockStep::text("reply")]);
        let (registry, storage, _temp_dir) = registry(llm);

        let session = registry.get_or_open("user-1").await.unwrap();
        session.submit("hello").await.unwrap();
        registry.get_or_open("user-2").await.unwrap();

        assert_eq!(registry.evict_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.len(), 2);

        tokio::time::sleep(Duration::from_millis(30)).await;
        registry.get_or_open("user-2").await.unwrap();

        assert_eq!(registry.evict_idle(Duration::from_millis(20)).await, 1);
        assert!(registry.get("user-1").is_none());
        assert!(registry.get("user-2").is_some());
        assert_eq!(storage.get("user-1").unwrap().unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_pending_session() {
        let llm = MockLlmClient::from_steps("mock", vec![MockStep::text("slow").with_delay(200)]);
        let (registry, _storage, _temp_dir) = registry(llm);

        let session = registry.get_or_open("user-1").await.unwrap();
        let submit = tokio::spawn(async move { session.submit("hello").await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(registry.evict_idle(Duration::ZERO).await, 0);
        assert!(registry.get("user-1").is_some());

        submit.await.unwrap().unwrap();
        assert_eq!(registry.evict_idle(Duration::ZERO).await, 1);
        assert!(registry.is_empty());
    }
}
