//! Conversation session: the per-client orchestrator for one user's chat.
//!
//! A submission updates the in-memory conversation first, then persists in
//! the background. Completion failures become assistant turns carrying a
//! diagnostic, so the caller always gets a reply to show.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use lara_ai::LlmClient;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::context::ContextWindowPolicy;
use crate::models::{Conversation, Turn, TurnRole};
use crate::storage::ConversationStore;

/// Reasons a submission is refused before anything changes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("Please type a message before sending.")]
    Empty,
    #[error("A reply is still pending.")]
    Busy,
}

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionServices {
    pub llm: Arc<dyn LlmClient>,
    pub store: Arc<dyn ConversationStore>,
    pub policy: Arc<ContextWindowPolicy>,
}

/// Sets a flag on acquire and clears it on drop.
struct FlagGuard(Arc<AtomicBool>);

impl FlagGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Live view of one user's conversation for one client.
pub struct ConversationSession {
    user_id: String,
    services: SessionServices,
    conversation: Arc<RwLock<Conversation>>,
    pending: Arc<AtomicBool>,
    summarizing: Arc<AtomicBool>,
    background: Mutex<Vec<JoinHandle<()>>>,
    last_active: Mutex<Instant>,
}

impl ConversationSession {
    /// Open a session, loading (or creating) the stored conversation.
    pub async fn open(user_id: impl Into<String>, services: SessionServices) -> Result<Self> {
        let user_id = user_id.into();
        let mut conversation = services.store.load(&user_id).await?;
        conversation.reconcile_summary();

        tracing::debug!(
            user_id = %user_id,
            turns = conversation.len(),
            "Opened conversation session"
        );

        Ok(Self {
            user_id,
            services,
            conversation: Arc::new(RwLock::new(conversation)),
            pending: Arc::new(AtomicBool::new(false)),
            summarizing: Arc::new(AtomicBool::new(false)),
            background: Mutex::new(Vec::new()),
            last_active: Mutex::new(Instant::now()),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Copy of the in-memory conversation.
    pub fn snapshot(&self) -> Conversation {
        self.conversation.read().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_summarizing(&self) -> bool {
        self.summarizing.load(Ordering::Acquire)
    }

    /// Mark the session as used now.
    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    /// Time since the session was last used.
    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }

    /// Whether the session can be dropped without losing work in flight.
    pub fn is_idle(&self, max_idle: Duration) -> bool {
        !self.is_pending() && !self.is_summarizing() && self.idle_for() >= max_idle
    }

    /// Submit user text and return the assistant turn shown in reply.
    pub async fn submit(&self, text: &str) -> std::result::Result<Turn, SubmitRejected> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitRejected::Empty);
        }
        let Some(_pending) = FlagGuard::acquire(&self.pending) else {
            return Err(SubmitRejected::Busy);
        };
        self.touch();

        let messages = {
            let mut conversation = self.conversation.write();
            let turn = conversation.append(TurnRole::User, text);
            self.persist_turn(turn);
            self.services.policy.build_request(&conversation)
        };

        let reply = match self.services.llm.generate(messages).await {
            Ok(content) => {
                let turn = self.append_local(TurnRole::Assistant, content);
                self.maybe_summarize();
                turn
            }
            Err(error) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    error_class = %error.class(),
                    error = %error,
                    "Completion failed"
                );
                self.append_local(TurnRole::Assistant, error.diagnostic())
            }
        };

        Ok(reply)
    }

    /// Wait for outstanding background writes and summarization.
    pub async fn flush(&self) {
        loop {
            let handles = std::mem::take(&mut *self.background.lock());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(error) = handle.await {
                    tracing::warn!(user_id = %self.user_id, error = %error, "Background task failed");
                }
            }
        }
    }

    fn append_local(&self, role: TurnRole, content: String) -> Turn {
        let turn = self.conversation.write().append(role, content);
        self.persist_turn(turn.clone());
        turn
    }

    fn persist_turn(&self, turn: Turn) {
        let store = self.services.store.clone();
        let user_id = self.user_id.clone();
        self.track(tokio::spawn(async move {
            if let Err(error) = store.append_turn(&user_id, &turn).await {
                tracing::warn!(user_id = %user_id, error = %error, "Failed to persist turn");
            }
        }));
    }

    fn maybe_summarize(&self) {
        let Some(job) = self
            .services
            .policy
            .summary_job(&self.conversation.read())
        else {
            return;
        };
        let Some(guard) = FlagGuard::acquire(&self.summarizing) else {
            tracing::debug!(user_id = %self.user_id, "Summarization already in flight");
            return;
        };

        let llm = self.services.llm.clone();
        let store = self.services.store.clone();
        let conversation = self.conversation.clone();
        let user_id = self.user_id.clone();

        self.track(tokio::spawn(async move {
            let _guard = guard;
            let summary = match job.run(llm.as_ref()).await {
                Ok(summary) => summary,
                Err(error) => {
                    tracing::warn!(
                        user_id = %user_id,
                        error_class = %error.class(),
                        error = %error,
                        "Summarization failed, keeping previous summary"
                    );
                    return;
                }
            };

            let applied = conversation.write().apply_summary(&summary);
            if !applied {
                tracing::debug!(user_id = %user_id, "Discarded stale summary");
                return;
            }
            tracing::info!(user_id = %user_id, cutoff = summary.cutoff, "Conversation summarized");

            if let Err(error) = store.replace_summary(&user_id, &summary).await {
                tracing::warn!(user_id = %user_id, error = %error, "Failed to persist summary");
            }
        }));
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut background = self.background.lock();
        background.retain(|handle| !handle.is_finished());
        background.push(handle);
    }
}
