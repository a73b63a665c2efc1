//! Assembler configuration parsing and validation.
//!
//! Every field has a default matching the chat backend's wire protocol, so
//! an empty TOML document (or [`AssemblerConfig::default`]) is a valid
//! configuration.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{AppError, Result};

/// Default per-line limit for the frame decoder: 1 MiB.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1_048_576;

fn default_data_prefix() -> String {
    "data:".into()
}

fn default_sentinel() -> String {
    "[DONE]".into()
}

fn default_response_field() -> String {
    "response".into()
}

fn default_directive_tag() -> String {
    "action".into()
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

fn default_read_chunk_bytes() -> usize {
    8192
}

fn default_snapshot_channel_capacity() -> usize {
    64
}

/// Wire-protocol and pipeline settings parsed from `assembler.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct AssemblerConfig {
    /// Prefix that marks a meaningful frame (matched case-insensitively).
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,
    /// End-of-stream sentinel literal carried in a data frame.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    /// JSON field holding the text fragment of a data frame.
    #[serde(default = "default_response_field")]
    pub response_field: String,
    /// Tag name of the embedded directive block, e.g. `action`.
    #[serde(default = "default_directive_tag")]
    pub directive_tag: String,
    /// Lines longer than this are discarded by the frame decoder.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// Read buffer size used by the async stream reader.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
    /// Capacity of the snapshot channel fed by the stream reader.
    #[serde(default = "default_snapshot_channel_capacity")]
    pub snapshot_channel_capacity: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            data_prefix: default_data_prefix(),
            sentinel: default_sentinel(),
            response_field: default_response_field(),
            directive_tag: default_directive_tag(),
            max_line_bytes: default_max_line_bytes(),
            read_chunk_bytes: default_read_chunk_bytes(),
            snapshot_channel_capacity: default_snapshot_channel_capacity(),
        }
    }
}

impl AssemblerConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.data_prefix.trim().is_empty() {
            return Err(AppError::Config("data_prefix must not be empty".into()));
        }

        if self.sentinel.trim().is_empty() {
            return Err(AppError::Config("sentinel must not be empty".into()));
        }

        if self.response_field.is_empty() {
            return Err(AppError::Config("response_field must not be empty".into()));
        }

        if self.directive_tag.is_empty()
            || !self
                .directive_tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AppError::Config(format!(
                "directive_tag must be a non-empty tag name, got {:?}",
                self.directive_tag
            )));
        }

        if self.max_line_bytes == 0 {
            return Err(AppError::Config(
                "max_line_bytes must be greater than zero".into(),
            ));
        }

        if self.read_chunk_bytes == 0 {
            return Err(AppError::Config(
                "read_chunk_bytes must be greater than zero".into(),
            ));
        }

        if self.snapshot_channel_capacity == 0 {
            return Err(AppError::Config(
                "snapshot_channel_capacity must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
