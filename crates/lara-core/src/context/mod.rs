//! Context window policy and conversation summarization.

pub mod summary;
pub mod window;

pub use summary::{SUMMARY_PROMPT, SummaryJob, format_transcript};
pub use window::{ContextWindowConfig, ContextWindowPolicy};
