//! Lara Storage - Low-level storage abstraction layer
//!
//! This crate provides the persistence layer for Lara, using redb as the
//! embedded database. It exposes byte-level APIs so the typed conversation
//! model can live in `lara-core` without a dependency cycle.
//!
//! # Tables
//!
//! - `conversations` - One JSON document per user id (turns + running summary)

pub mod conversation;

pub use conversation::ConversationStorage;
