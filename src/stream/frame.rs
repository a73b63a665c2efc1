//! Interpretation of a single decoded line as a protocol frame.
//!
//! | Line shape                      | Frame kind               | Fragment              |
//! |---------------------------------|--------------------------|-----------------------|
//! | empty / whitespace              | [`FrameKind::Ignorable`] | none                  |
//! | no `data:` prefix               | [`FrameKind::Ignorable`] | none                  |
//! | `data: [DONE]`                  | [`FrameKind::Sentinel`]  | none                  |
//! | `data: {"response":"text"}`     | [`FrameKind::Data`]      | `text`                |
//! | `data: <anything else>`         | [`FrameKind::Data`]      | remainder, verbatim   |
//!
//! Parsing never fails: a data frame whose body is not the expected JSON
//! still contributes its raw remainder to the message.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::AssemblerConfig;

/// Classification of one decoded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// Carries a text fragment for the current message.
    Data,
    /// End-of-stream marker; no further frames belong to this turn.
    Sentinel,
    /// Blank line, comment, or any line without the data prefix.
    Ignorable,
}

/// One decoded line after interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    /// Frame classification.
    pub kind: FrameKind,
    /// Text after the data prefix for data and sentinel frames, otherwise
    /// the trimmed line.
    pub payload: String,
    /// Text to append to the message; only set for [`FrameKind::Data`].
    pub fragment: Option<String>,
}

impl StreamFrame {
    fn ignorable(payload: &str) -> Self {
        Self {
            kind: FrameKind::Ignorable,
            payload: payload.to_owned(),
            fragment: None,
        }
    }

    /// Whether this frame ends the turn.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.kind == FrameKind::Sentinel
    }
}

/// Stateless parser turning lines into [`StreamFrame`]s.
#[derive(Debug, Clone)]
pub struct FramePayloadParser {
    prefix_name: String,
    prefix_colon: bool,
    sentinel: String,
    response_field: String,
}

impl FramePayloadParser {
    /// Build a parser from the wire settings in `config`.
    #[must_use]
    pub fn new(config: &AssemblerConfig) -> Self {
        let prefix = config.data_prefix.trim();
        let (prefix_name, prefix_colon) = match prefix.strip_suffix(':') {
            Some(name) => (name.trim_end().to_owned(), true),
            None => (prefix.to_owned(), false),
        };
        Self {
            prefix_name,
            prefix_colon,
            sentinel: config.sentinel.trim().to_owned(),
            response_field: config.response_field.clone(),
        }
    }

    /// Interpret one line.
    #[must_use]
    pub fn parse(&self, line: &str) -> StreamFrame {
        let line = line.trim();
        if line.is_empty() {
            return StreamFrame::ignorable(line);
        }

        let Some(remainder) = self.strip_data_prefix(line) else {
            debug!(line, "frame parser: ignoring line without data prefix");
            return StreamFrame::ignorable(line);
        };

        if remainder == self.sentinel {
            return StreamFrame {
                kind: FrameKind::Sentinel,
                payload: remainder.to_owned(),
                fragment: None,
            };
        }

        let fragment = self.extract_fragment(remainder);
        StreamFrame {
            kind: FrameKind::Data,
            payload: remainder.to_owned(),
            fragment: Some(fragment),
        }
    }

    /// Strip `data:` ignoring ASCII case and whitespace before the colon.
    fn strip_data_prefix<'a>(&self, line: &'a str) -> Option<&'a str> {
        let name_len = self.prefix_name.len();
        let head = line.get(..name_len)?;
        if !head.eq_ignore_ascii_case(&self.prefix_name) {
            return None;
        }

        let rest = line[name_len..].trim_start();
        if self.prefix_colon {
            rest.strip_prefix(':').map(str::trim)
        } else {
            Some(rest.trim())
        }
    }

    fn extract_fragment(&self, remainder: &str) -> String {
        match serde_json::from_str::<Value>(remainder) {
            Ok(Value::Object(map)) => match map.get(&self.response_field) {
                Some(Value::String(text)) => text.clone(),
                _ => {
                    debug!(
                        field = self.response_field.as_str(),
                        "frame parser: json frame lacks text field, keeping raw payload"
                    );
                    remainder.to_owned()
                }
            },
            Ok(_) => remainder.to_owned(),
            Err(err) => {
                if let Some(text) = self.salvage_envelope(remainder) {
                    debug!(error = %err, "frame parser: recovered text from unescaped envelope");
                    return text.to_owned();
                }
                debug!(error = %err, "frame parser: non-json payload, keeping raw payload");
                remainder.to_owned()
            }
        }
    }

    /// Recover `text` from `{"response":"text"}` when `text` itself contains
    /// unescaped quotes and the envelope therefore fails to parse.
    fn salvage_envelope<'a>(&self, remainder: &'a str) -> Option<&'a str> {
        let rest = remainder.strip_prefix('{')?.trim_start();
        let rest = rest.strip_prefix('"')?;
        let rest = rest.strip_prefix(self.response_field.as_str())?;
        let rest = rest.strip_prefix('"')?.trim_start();
        let rest = rest.strip_prefix(':')?.trim_start();
        let rest = rest.strip_prefix('"')?;

        let rest = rest.strip_suffix('}')?.trim_end();
        rest.strip_suffix('"')
    }
}

impl Default for FramePayloadParser {
    fn default() -> Self {
        Self::new(&AssemblerConfig::default())
    }
}
