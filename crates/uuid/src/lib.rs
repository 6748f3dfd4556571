//! Identifier utilities for conversation threads.
//!
//! Conversation threads are stored under sharded directories derived from a UUID. To keep path
//! derivation deterministic, conversation identifiers use a *canonical* representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - [`ConversationId`], a wrapper that guarantees the canonical format once constructed and
//!   derives the thread's sharded directory.
//! - [`TimestampId`], a time-prefixed message identifier that sorts in creation order.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, a thread lives under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `conversation_data/conversations/55/0e/550e8400e29b41d4a716446655440000/`

mod conversation_id;
mod timestamp_id;

pub use conversation_id::{ConversationId, Uuid};
pub use timestamp_id::TimestampId;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
