//! Append-only text buffer for one bot message.

/// Raw text of one in-flight message.
///
/// Fragments are appended in arrival order; the buffer never shrinks or
/// reorders for the lifetime of the message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextAccumulator {
    raw: String,
}

impl TextAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `fragment` and return the full raw text. Empty fragments are
    /// no-ops.
    pub fn append(&mut self, fragment: &str) -> &str {
        self.raw.push_str(fragment);
        &self.raw
    }

    /// Raw text accumulated so far.
    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    /// Whether nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}
