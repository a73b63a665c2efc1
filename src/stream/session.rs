//! Per-turn assembly state machine.
//!
//! ```text
//!   Idle ──start──▶ Streaming ──sentinel / finish──▶ Complete
//!     │                 │
//!     └─────abort───────┴──────────abort───────────▶ Aborted
//! ```
//!
//! `Complete` and `Aborted` are final: every later call is a no-op that
//! returns the final snapshot. A new turn needs a new session.

use std::fmt::{Display, Formatter};

use serde::Serialize;
use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::config::AssemblerConfig;
use crate::stream::accumulator::TextAccumulator;
use crate::stream::decoder::FrameDecoder;
use crate::stream::directive::{Derived, Directive, DirectiveExtractor};
use crate::stream::frame::{FrameKind, FramePayloadParser};
use crate::{AppError, Result};

/// Lifecycle state of a [`StreamSession`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, not yet started.
    #[default]
    Idle,
    /// Accepting chunks.
    Streaming,
    /// Ended by a sentinel frame or a clean transport close.
    Complete,
    /// Ended by the caller; text so far is retained.
    Aborted,
}

impl SessionState {
    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Aborted)
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the message being assembled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Everything received so far, directive markup included.
    pub raw_text: String,
    /// Human-safe projection of `raw_text`.
    pub display_text: String,
    /// Directive detected in `raw_text`.
    pub directive: Directive,
    /// Lifecycle state after the call that produced this snapshot.
    pub session_state: SessionState,
    /// Abort reason; never part of `raw_text`.
    pub error: Option<String>,
}

/// Assembler for one in-flight bot turn.
#[derive(Debug)]
pub struct StreamSession {
    id: String,
    state: SessionState,
    decoder: FrameDecoder,
    parser: FramePayloadParser,
    text: TextAccumulator,
    extractor: DirectiveExtractor,
    derived: Derived,
    abort_reason: Option<String>,
}

impl StreamSession {
    /// Create an idle session using the wire settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the directive tag cannot be compiled
    /// into a marker pattern.
    pub fn new(config: &AssemblerConfig) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            state: SessionState::Idle,
            decoder: FrameDecoder::new(config.max_line_bytes),
            parser: FramePayloadParser::new(config),
            text: TextAccumulator::new(),
            extractor: DirectiveExtractor::new(&config.directive_tag)?,
            derived: Derived::default(),
            abort_reason: None,
        })
    }

    /// Unique session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Raw text accumulated so far.
    #[must_use]
    pub fn raw_text(&self) -> &str {
        self.text.raw_text()
    }

    /// Display text derived from the current raw text.
    #[must_use]
    pub fn display_text(&self) -> &str {
        &self.derived.display_text
    }

    /// Directive derived from the current raw text.
    #[must_use]
    pub fn directive(&self) -> &Directive {
        &self.derived.directive
    }

    /// Reason recorded by [`abort`](Self::abort), if any.
    #[must_use]
    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self.state, next),
            (SessionState::Idle, SessionState::Streaming | SessionState::Aborted)
                | (
                    SessionState::Streaming,
                    SessionState::Complete | SessionState::Aborted
                )
        )
    }

    /// Move from `Idle` to `Streaming`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidTransition` if the session was already
    /// started.
    pub fn start(&mut self) -> Result<()> {
        if !self.can_transition_to(SessionState::Streaming) {
            return Err(AppError::InvalidTransition(format!(
                "cannot start session {} in {} state",
                self.id, self.state
            )));
        }
        self.state = SessionState::Streaming;
        debug!(session_id = %self.id, "stream session started");
        Ok(())
    }

    /// Feed a text chunk through the pipeline.
    ///
    /// A no-op outside `Streaming`. A sentinel frame completes the session;
    /// lines after it in the same chunk are ignored.
    pub fn submit(&mut self, chunk: &str) -> Snapshot {
        self.submit_bytes(chunk.as_bytes())
    }

    /// Feed a raw byte chunk through the pipeline.
    ///
    /// Same contract as [`submit`](Self::submit); bytes of a multi-byte
    /// character may be split across calls.
    pub fn submit_bytes(&mut self, chunk: &[u8]) -> Snapshot {
        if self.state != SessionState::Streaming {
            debug!(
                session_id = %self.id,
                state = %self.state,
                "stream session: ignoring chunk outside streaming state"
            );
            return self.snapshot();
        }

        for line in self.decoder.feed_bytes(chunk) {
            if self.apply_line(&line) == FrameKind::Sentinel {
                break;
            }
        }

        self.snapshot()
    }

    /// End the turn after a clean transport close without a sentinel.
    ///
    /// Flushes the decoder first so an unterminated final line is applied.
    pub fn finish(&mut self) -> Snapshot {
        if self.state != SessionState::Streaming {
            debug!(session_id = %self.id, state = %self.state, "stream session: finish ignored");
            return self.snapshot();
        }

        if let Some(line) = self.decoder.flush() {
            self.apply_line(&line);
        }

        if self.state == SessionState::Streaming {
            self.complete("transport closed");
        }

        self.snapshot()
    }

    /// Stop the turn, keeping the text assembled so far.
    ///
    /// `reason` is recorded separately from the message text. A no-op once
    /// the session is terminal.
    pub fn abort(&mut self, reason: impl Into<String>) -> Snapshot {
        if !self.can_transition_to(SessionState::Aborted) {
            debug!(session_id = %self.id, state = %self.state, "stream session: abort ignored");
            return self.snapshot();
        }

        let span = info_span!("abort_stream_session", session_id = %self.id);
        let _guard = span.enter();

        let reason = reason.into();
        info!(
            reason = reason.as_str(),
            raw_len = self.text.raw_text().len(),
            "stream session aborted"
        );
        self.abort_reason = Some(reason);
        self.state = SessionState::Aborted;
        self.snapshot()
    }

    /// Current snapshot without changing state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            raw_text: self.text.raw_text().to_owned(),
            display_text: self.derived.display_text.clone(),
            directive: self.derived.directive.clone(),
            session_state: self.state,
            error: self.abort_reason.clone(),
        }
    }

    /// Parse one line and apply its effect; returns the frame kind.
    fn apply_line(&mut self, line: &str) -> FrameKind {
        let frame = self.parser.parse(line);
        match frame.kind {
            FrameKind::Data => {
                if let Some(fragment) = frame.fragment.as_deref().filter(|f| !f.is_empty()) {
                    let raw = self.text.append(fragment);
                    self.derived = self.extractor.derive(raw);
                }
            }
            FrameKind::Sentinel => self.complete("sentinel"),
            FrameKind::Ignorable => {}
        }
        frame.kind
    }

    fn complete(&mut self, cause: &str) {
        self.state = SessionState::Complete;
        info!(
            session_id = %self.id,
            cause,
            raw_len = self.text.raw_text().len(),
            directive = ?self.derived.directive.state,
            "stream session complete"
        );
    }
}
