//! Process-wide signed-in identity.
//!
//! The hub holds at most one identity. Interested parties either hold a
//! `watch` receiver or register a callback with [`IdentityHub::subscribe`].

use once_cell::sync::Lazy;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Handle for a registered identity callback. Dropping it unsubscribes.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Current identity, broadcast to subscribers on every change.
pub struct IdentityHub {
    tx: watch::Sender<Option<Identity>>,
}

impl Default for IdentityHub {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityHub {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Set the current identity. Returns `false` if it was already current.
    pub fn sign_in(&self, identity: Identity) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&identity) {
                false
            } else {
                *current = Some(identity);
                true
            }
        });
        if changed {
            tracing::info!(user_id = ?self.current().map(|i| i.user_id), "Signed in");
        }
        changed
    }

    /// Clear the current identity. Returns `false` if nobody was signed in.
    pub fn sign_out(&self) -> bool {
        let changed = self.tx.send_if_modified(|current| current.take().is_some());
        if changed {
            tracing::info!("Signed out");
        }
        changed
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every identity change.
    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    /// Invoke `callback` with the current identity and again after every change.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(Option<Identity>) + Send + 'static,
    {
        let mut rx = self.tx.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                let identity = rx.borrow_and_update().clone();
                callback(identity);
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        Subscription { handle }
    }
}

static GLOBAL_HUB: Lazy<IdentityHub> = Lazy::new(IdentityHub::new);

/// The process-wide identity hub.
pub fn global() -> &'static IdentityHub {
    &GLOBAL_HUB
}
