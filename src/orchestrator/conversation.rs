//! Conversation transcript and turn ownership.
//!
//! A conversation allows at most one streaming session at a time. Starting a
//! new user turn while the previous reply is still streaming aborts that
//! session with [`SUPERSEDED_REASON`] and cancels its upstream read, so two
//! replies can never interleave in one transcript.
//!
//! Every session operation mirrors the resulting snapshot into the turn's
//! bot entry. When a turn ends abnormally an `Error` entry is appended next
//! to it; the abort reason never becomes part of the bot text.

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::AssemblerConfig;
use crate::models::transcript::{EntryBody, NoticeKind, TranscriptEntry};
use crate::models::transport::TransportFailure;
use crate::stream::reader::run_reader;
use crate::stream::session::{SessionState, Snapshot, StreamSession};
use crate::{AppError, Result};

/// Abort reason recorded when a new turn replaces a streaming one.
pub const SUPERSEDED_REASON: &str = "superseded";

/// The turn currently owned by the conversation.
#[derive(Debug)]
struct ActiveTurn {
    session: StreamSession,
    entry_index: usize,
    cancel: CancellationToken,
}

/// Ordered transcript plus the in-flight bot turn.
#[derive(Debug)]
pub struct Conversation {
    id: String,
    config: AssemblerConfig,
    entries: Vec<TranscriptEntry>,
    active: Option<ActiveTurn>,
    directive_notice_posted: bool,
}

impl Conversation {
    /// Create an empty conversation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `config` fails validation.
    pub fn new(config: AssemblerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            config,
            entries: Vec::new(),
            active: None,
            directive_notice_posted: false,
        })
    }

    /// Unique conversation identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Transcript in order of creation.
    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Session of the latest turn, if any turn has begun.
    #[must_use]
    pub fn active_session(&self) -> Option<&StreamSession> {
        self.active.as_ref().map(|turn| &turn.session)
    }

    /// Start a new user turn and return the token that cancels its read.
    ///
    /// A still-running previous session is aborted first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the session cannot be built.
    pub fn begin_turn(&mut self, user_text: &str) -> Result<CancellationToken> {
        let span = info_span!("begin_turn", conversation_id = %self.id);
        let _guard = span.enter();

        if let Some(turn) = self.active.as_mut() {
            if !turn.session.state().is_terminal() {
                warn!(
                    session_id = turn.session.id(),
                    "previous reply still streaming, superseding it"
                );
                turn.cancel.cancel();
                self.abort(SUPERSEDED_REASON)?;
            }
        }

        self.entries.push(TranscriptEntry::new(EntryBody::User {
            text: user_text.to_owned(),
        }));

        let mut session = StreamSession::new(&self.config)?;
        session.start()?;
        let cancel = CancellationToken::new();

        self.entries
            .push(TranscriptEntry::bot(session.id(), &session.snapshot()));
        let entry_index = self.entries.len() - 1;

        info!(session_id = session.id(), "turn started");
        self.active = Some(ActiveTurn {
            session,
            entry_index,
            cancel: cancel.clone(),
        });
        Ok(cancel)
    }

    /// Feed a chunk of the active reply.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidTransition` if no turn has begun.
    pub fn submit(&mut self, chunk: &str) -> Result<Snapshot> {
        self.apply(|session| session.submit(chunk))
    }

    /// The reply's transport closed cleanly.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidTransition` if no turn has begun.
    pub fn finish(&mut self) -> Result<Snapshot> {
        self.apply(StreamSession::finish)
    }

    /// Abort the active reply with `reason`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidTransition` if no turn has begun.
    pub fn abort(&mut self, reason: &str) -> Result<Snapshot> {
        self.apply(|session| session.abort(reason))
    }

    /// Abort the active reply because its transport failed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidTransition` if no turn has begun.
    pub fn fail(&mut self, failure: &TransportFailure) -> Result<Snapshot> {
        self.abort(&failure.to_string())
    }

    /// Drive the active reply from `source` until it ends.
    ///
    /// Uses the configured read size and the turn's cancellation token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidTransition` if no turn has begun or the
    /// active turn has already ended.
    pub async fn stream_turn<R>(
        &mut self,
        source: R,
        snapshot_tx: Option<&mpsc::Sender<Snapshot>>,
    ) -> Result<Snapshot>
    where
        R: AsyncRead + Unpin,
    {
        let chunk_bytes = self.config.read_chunk_bytes;
        let turn = self.active_turn_mut()?;
        let before = turn.session.state();
        let cancel = turn.cancel.clone();

        let snapshot =
            run_reader(&mut turn.session, source, chunk_bytes, snapshot_tx, &cancel).await?;
        self.settle(before, &snapshot);
        Ok(snapshot)
    }

    fn active_turn_mut(&mut self) -> Result<&mut ActiveTurn> {
        self.active
            .as_mut()
            .ok_or_else(|| AppError::InvalidTransition("no turn in progress".into()))
    }

    fn apply(&mut self, op: impl FnOnce(&mut StreamSession) -> Snapshot) -> Result<Snapshot> {
        let turn = self.active_turn_mut()?;
        let before = turn.session.state();
        let snapshot = op(&mut turn.session);
        self.settle(before, &snapshot);
        Ok(snapshot)
    }

    /// Mirror `snapshot` into the bot entry and post sibling entries when
    /// the turn has just ended.
    fn settle(&mut self, before: SessionState, snapshot: &Snapshot) {
        let Some(turn) = self.active.as_ref() else {
            return;
        };
        let session_id = turn.session.id().to_owned();
        if let Some(entry) = self.entries.get_mut(turn.entry_index) {
            entry.update_from(snapshot);
        }

        if before.is_terminal() {
            return;
        }

        match snapshot.session_state {
            SessionState::Aborted => {
                let reason = snapshot.error.clone().unwrap_or_default();
                self.entries
                    .push(TranscriptEntry::new(EntryBody::Error { session_id, reason }));
            }
            SessionState::Complete
                if snapshot.directive.is_present() && !self.directive_notice_posted =>
            {
                self.directive_notice_posted = true;
                self.entries.push(TranscriptEntry::new(EntryBody::Notice {
                    kind: NoticeKind::DirectiveDetected,
                }));
            }
            _ => {}
        }
    }
}
