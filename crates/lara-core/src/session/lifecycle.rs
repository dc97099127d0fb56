//! Ties the active conversation session to the signed-in identity.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::conversation::{ConversationSession, SessionServices};
use crate::identity::{Identity, IdentityHub};

/// Owns the single active session for an interactive client.
///
/// Sign-in opens a session for the new identity; sign-out flushes pending
/// writes and discards it.
pub struct SessionLifecycle {
    services: SessionServices,
    active: watch::Sender<Option<Arc<ConversationSession>>>,
}

impl SessionLifecycle {
    pub fn new(services: SessionServices) -> Self {
        let (active, _rx) = watch::channel(None);
        Self { services, active }
    }

    /// Currently active session, if someone is signed in.
    pub fn active(&self) -> Option<Arc<ConversationSession>> {
        self.active.borrow().clone()
    }

    /// Receiver that observes session changes.
    pub fn watch_active(&self) -> watch::Receiver<Option<Arc<ConversationSession>>> {
        self.active.subscribe()
    }

    /// React to an identity change.
    pub async fn handle_identity(&self, identity: Option<Identity>) -> Result<()> {
        let current = self.active();

        if let (Some(identity), Some(session)) = (&identity, &current)
            && session.user_id() == identity.user_id
        {
            return Ok(());
        }

        // Observers only see the session go away once its writes are durable
        if let Some(session) = current {
            session.flush().await;
            self.active.send_replace(None);
            tracing::info!(user_id = %session.user_id(), "Closed conversation session");
        }

        if let Some(identity) = identity {
            let session =
                ConversationSession::open(identity.user_id, self.services.clone()).await?;
            self.active.send_replace(Some(Arc::new(session)));
        }

        Ok(())
    }

    /// Follow the hub until it is dropped.
    pub fn attach(self: Arc<Self>, hub: &IdentityHub) -> JoinHandle<()> {
        let mut rx = hub.watch();
        tokio::spawn(async move {
            loop {
                let identity = rx.borrow_and_update().clone();
                if let Err(error) = self.handle_identity(identity).await {
                    tracing::warn!(error = %error, "Failed to open conversation session");
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
