//! Line framing for chunked chat-backend streams.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a configurable maximum line
//! length so that an unterminated or oversized frame from a misbehaving
//! backend cannot grow the buffer without bound.
//!
//! Chunks are buffered as raw bytes and only decoded once a full line is
//! available, so a multi-byte UTF-8 character split across two transport
//! reads is reassembled before decoding.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};
use tracing::warn;

use crate::config::DEFAULT_MAX_LINE_BYTES;
use crate::AppError;

/// Incremental `\n`-delimited line decoder.
///
/// [`feed`](Self::feed) returns every line completed by the new chunk and
/// keeps the trailing partial line for the next call.
/// [`flush`](Self::flush) hands back that leftover once the stream ends.
///
/// A trailing `\r` is stripped from each line. Lines longer than the
/// configured limit, or that are not valid UTF-8, are logged at `WARN` and
/// skipped; decoding resumes at the next line.
#[derive(Debug)]
pub struct FrameDecoder {
    codec: LinesCodec,
    buf: BytesMut,
    max_line_bytes: usize,
}

impl FrameDecoder {
    /// Create a decoder that discards lines longer than `max_line_bytes`.
    #[must_use]
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            codec: LinesCodec::new_with_max_length(max_line_bytes),
            buf: BytesMut::new(),
            max_line_bytes,
        }
    }

    /// Append a text chunk and return the lines it completes, in order.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.feed_bytes(chunk.as_bytes())
    }

    /// Append a raw byte chunk and return the lines it completes, in order.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        loop {
            match self.codec.decode(&mut self.buf) {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => break,
                Err(err) => {
                    let err = self.map_codec_error(err);
                    warn!(error = %err, "frame decoder: skipping undecodable line");
                }
            }
        }
        lines
    }

    /// Return and clear the final unterminated line, if any.
    ///
    /// Called once when the transport closes so a sentinel or payload that
    /// arrived without a trailing newline is not lost.
    pub fn flush(&mut self) -> Option<String> {
        loop {
            match self.codec.decode_eof(&mut self.buf) {
                Ok(line) => return line,
                Err(err) => {
                    let err = self.map_codec_error(err);
                    warn!(error = %err, "frame decoder: dropping undecodable final line");
                    if self.buf.is_empty() {
                        return None;
                    }
                }
            }
        }
    }

    /// Number of bytes buffered for the current partial line.
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    fn map_codec_error(&self, e: LinesCodecError) -> AppError {
        match e {
            LinesCodecError::MaxLineLengthExceeded => AppError::Frame(format!(
                "line too long: exceeded {} bytes",
                self.max_line_bytes
            )),
            LinesCodecError::Io(io_err) => AppError::Frame(io_err.to_string()),
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}
