#![forbid(unsafe_code)]

//! Streaming chat-response assembler.
//!
//! Rebuilds a bot reply from a chunked `data:` frame stream into a raw text,
//! a human-safe display text with any trailing `<action>` block hidden, and
//! a descriptor of that block for an external dispatcher.

pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod stream;

pub use config::AssemblerConfig;
pub use errors::{AppError, Result};
