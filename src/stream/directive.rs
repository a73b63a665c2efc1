//! Display-text projection and directive detection over accumulated text.
//!
//! A bot message may end with one machine-readable block:
//!
//! ```text
//! Your table is reserved.<action type="x">{"type":"book","date":"2024-05-01"}</action>
//! ```
//!
//! [`DirectiveExtractor::derive`] is a pure function of the whole raw text and
//! is re-run after every fragment. Re-scanning the full buffer keeps it
//! correct when a marker is split across fragments; messages are short and
//! carry at most one directive, so the linear scan per fragment is cheap.
//!
//! Everything from the first opening marker onwards is hidden from the
//! display text as soon as the marker is complete, even while the closing
//! marker has not arrived yet.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{AppError, Result};

/// Directive type reported when the block body is not a JSON object.
pub const UNKNOWN_DIRECTIVE_TYPE: &str = "unknown";

/// Progress of the directive block within a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveState {
    /// No opening marker seen.
    #[default]
    Absent,
    /// Opening marker seen, closing marker not yet.
    Open,
    /// Both markers seen; body parsed (or degraded to `unknown`).
    Complete,
}

/// Descriptor of the embedded directive, handed unexecuted to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Directive {
    /// Detection state.
    pub state: DirectiveState,
    /// Value of the body's `type` field, or [`UNKNOWN_DIRECTIVE_TYPE`].
    /// Only set once the directive is complete.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Parsed JSON body; `None` unless complete and well-formed.
    pub payload: Option<Value>,
}

impl Directive {
    /// No directive in the text.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Opening marker present, body still streaming.
    #[must_use]
    pub fn open() -> Self {
        Self {
            state: DirectiveState::Open,
            ..Self::default()
        }
    }

    /// Closed block with the given type and optional payload.
    #[must_use]
    pub fn complete(kind: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            state: DirectiveState::Complete,
            kind: Some(kind.into()),
            payload,
        }
    }

    /// Whether an opening marker has been seen.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.state != DirectiveState::Absent
    }
}

/// Output of [`DirectiveExtractor::derive`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Derived {
    /// Human-safe projection of the raw text.
    pub display_text: String,
    /// Directive detected in the raw text.
    pub directive: Directive,
}

/// Compiled marker patterns for one directive tag name.
#[derive(Debug, Clone)]
pub struct DirectiveExtractor {
    open: Regex,
    close: Regex,
}

impl DirectiveExtractor {
    /// Compile the opening and closing marker patterns for `tag`.
    ///
    /// The opening marker tolerates whitespace and attributes
    /// (`< action id="1">`); both markers match case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the patterns fail to compile.
    pub fn new(tag: &str) -> Result<Self> {
        let tag = regex::escape(tag);
        let open = Regex::new(&format!(r"(?i)<\s*{tag}\b[^>]*>"))
            .map_err(|err| AppError::Config(format!("invalid directive tag: {err}")))?;
        let close = Regex::new(&format!(r"(?i)<\s*/\s*{tag}\s*>"))
            .map_err(|err| AppError::Config(format!("invalid directive tag: {err}")))?;
        Ok(Self { open, close })
    }

    /// Derive the display text and directive state from the full raw text.
    #[must_use]
    pub fn derive(&self, raw_text: &str) -> Derived {
        let Some(open) = self.open.find(raw_text) else {
            return Derived {
                display_text: raw_text.to_owned(),
                directive: Directive::absent(),
            };
        };

        let display_text = raw_text[..open.start()].trim().to_owned();
        let after_open = &raw_text[open.end()..];

        let directive = match self.close.find(after_open) {
            None => Directive::open(),
            Some(close) => parse_body(&after_open[..close.start()]),
        };

        Derived {
            display_text,
            directive,
        }
    }
}

/// Parse the text between the markers; never fails.
fn parse_body(body: &str) -> Directive {
    match serde_json::from_str::<Value>(body) {
        Ok(payload @ Value::Object(_)) => {
            let kind = payload
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_DIRECTIVE_TYPE)
                .to_owned();
            Directive::complete(kind, Some(payload))
        }
        Ok(other) => {
            debug!(body = %other, "directive extractor: body is not a json object");
            Directive::complete(UNKNOWN_DIRECTIVE_TYPE, None)
        }
        Err(err) => {
            debug!(error = %err, "directive extractor: malformed directive body");
            Directive::complete(UNKNOWN_DIRECTIVE_TYPE, None)
        }
    }
}
