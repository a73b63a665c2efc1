//! Async pump feeding a [`StreamSession`] from a byte source.
//!
//! The assembler itself performs no I/O. This module is the caller-side loop
//! that reads chunks from any [`AsyncRead`] (an HTTP body adapter, a socket,
//! a captured file), submits them in arrival order, and publishes snapshots.
//!
//! | Source event          | Session effect                               |
//! |-----------------------|----------------------------------------------|
//! | chunk                 | [`StreamSession::submit_bytes`]              |
//! | sentinel frame        | session completes; reader stops              |
//! | EOF                   | [`StreamSession::finish`]                    |
//! | read error            | [`StreamSession::abort`] with network reason |
//! | cancellation          | [`StreamSession::abort`] with `cancelled`    |

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::transport::TransportFailure;
use crate::stream::session::{SessionState, Snapshot, StreamSession};
use crate::{AppError, Result};

/// Abort reason recorded when the cancellation token fires.
pub const CANCELLED_REASON: &str = "cancelled";

/// Drive `session` from `source` until the turn ends.
///
/// Reads up to `chunk_bytes` per chunk. An idle session is started first.
/// Every snapshot that differs from the previously published one is sent on
/// `snapshot_tx`; once the receiver is dropped, publishing stops but the
/// session is still driven to its terminal state.
///
/// # Cancellation
///
/// When `cancel` fires, the session is aborted with [`CANCELLED_REASON`] and
/// the reader returns without reading further.
///
/// # Errors
///
/// Returns `AppError::InvalidTransition` if `session` is already terminal.
/// Transport failures are not errors: they abort the session and the final
/// snapshot is returned.
pub async fn run_reader<R>(
    session: &mut StreamSession,
    source: R,
    chunk_bytes: usize,
    snapshot_tx: Option<&mpsc::Sender<Snapshot>>,
    cancel: &CancellationToken,
) -> Result<Snapshot>
where
    R: AsyncRead + Unpin,
{
    match session.state() {
        SessionState::Idle => session.start()?,
        SessionState::Streaming => {}
        state => {
            return Err(AppError::InvalidTransition(format!(
                "cannot read into session {} in {state} state",
                session.id()
            )));
        }
    }

    let session_id = session.id().to_owned();
    let mut chunks = ReaderStream::with_capacity(source, chunk_bytes.max(1));
    let mut publisher = Publisher::new(snapshot_tx);

    while session.state() == SessionState::Streaming {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(session_id = %session_id, "stream reader: cancellation received, stopping");
                session.abort(CANCELLED_REASON);
            }

            item = chunks.next() => {
                match item {
                    None => {
                        debug!(session_id = %session_id, "stream reader: EOF detected");
                        session.finish();
                    }

                    Some(Err(err)) => {
                        let failure = TransportFailure::from_io(&err);
                        warn!(session_id = %session_id, error = %err, "stream reader: read error, aborting");
                        session.abort(failure.to_string());
                    }

                    Some(Ok(bytes)) => {
                        let snapshot = session.submit_bytes(&bytes);
                        publisher.publish(&session_id, snapshot).await;
                    }
                }
            }
        }
    }

    let last = session.snapshot();
    publisher.publish(&session_id, last.clone()).await;
    Ok(last)
}

/// Sends snapshots that changed since the last send.
struct Publisher<'a> {
    tx: Option<&'a mpsc::Sender<Snapshot>>,
    last: Option<Snapshot>,
}

impl<'a> Publisher<'a> {
    fn new(tx: Option<&'a mpsc::Sender<Snapshot>>) -> Self {
        Self { tx, last: None }
    }

    async fn publish(&mut self, session_id: &str, snapshot: Snapshot) {
        let Some(tx) = self.tx else {
            return;
        };
        if self.last.as_ref() == Some(&snapshot) {
            return;
        }

        if tx.send(snapshot.clone()).await.is_err() {
            debug!(
                session_id,
                "stream reader: snapshot receiver closed, no longer publishing"
            );
            self.tx = None;
            return;
        }
        self.last = Some(snapshot);
    }
}
