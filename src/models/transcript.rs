//! Transcript entries for one conversation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::stream::directive::Directive;
use crate::stream::session::{SessionState, Snapshot};

/// Informational entries the assembler adds beside bot messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A bot reply carried a directive block; posted once per conversation.
    DirectiveDetected,
}

/// Content of a transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "from")]
pub enum EntryBody {
    /// Text the user sent.
    User {
        /// Message text.
        text: String,
    },
    /// A bot reply, mirrored from its stream session.
    Bot {
        /// Session assembling this reply.
        session_id: String,
        /// Full received text.
        raw_text: String,
        /// Human-safe projection.
        display_text: String,
        /// Directive found in the reply.
        directive: Directive,
        /// Session state at the last update.
        state: SessionState,
    },
    /// A turn ended abnormally; sibling of the bot entry it refers to.
    Error {
        /// Session that was aborted.
        session_id: String,
        /// Abort reason.
        reason: String,
    },
    /// Informational notice.
    Notice {
        /// Notice type.
        kind: NoticeKind,
    },
}

/// One transcript line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    /// Unique entry identifier.
    pub id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Entry content.
    #[serde(flatten)]
    pub body: EntryBody,
}

impl TranscriptEntry {
    /// Construct an entry with a generated identifier.
    #[must_use]
    pub fn new(body: EntryBody) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            body,
        }
    }

    /// Bot entry mirroring `snapshot`.
    #[must_use]
    pub fn bot(session_id: &str, snapshot: &Snapshot) -> Self {
        Self::new(EntryBody::Bot {
            session_id: session_id.to_owned(),
            raw_text: snapshot.raw_text.clone(),
            display_text: snapshot.display_text.clone(),
            directive: snapshot.directive.clone(),
            state: snapshot.session_state,
        })
    }

    /// Refresh a bot entry from a newer snapshot; other entries are untouched.
    pub fn update_from(&mut self, snapshot: &Snapshot) {
        if let EntryBody::Bot {
            raw_text,
            display_text,
            directive,
            state,
            ..
        } = &mut self.body
        {
            raw_text.clone_from(&snapshot.raw_text);
            display_text.clone_from(&snapshot.display_text);
            directive.clone_from(&snapshot.directive);
            *state = snapshot.session_state;
        }
    }
}
