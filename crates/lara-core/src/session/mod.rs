//! Conversation sessions and their lifecycle.

pub mod conversation;
pub mod lifecycle;
pub mod registry;

pub use conversation::{ConversationSession, SessionServices, SubmitRejected};
pub use lifecycle::SessionLifecycle;
pub use registry::SessionRegistry;
