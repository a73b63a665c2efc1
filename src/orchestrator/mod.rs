//! Conversation orchestration.
//!
//! Owns the transcript of one conversation and the lifecycle of the
//! stream session assembling each bot turn.

pub mod conversation;
