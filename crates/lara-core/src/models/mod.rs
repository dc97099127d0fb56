//! Core data models.

pub mod conversation;

pub use conversation::{Conversation, Summary, Turn, TurnRole};
