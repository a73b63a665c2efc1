//! Classification of transport-level failures.
//!
//! The chunk source (an HTTP response body, a socket, a file) is owned by
//! the caller. When it fails, the caller classifies the failure here and
//! aborts the session with the failure as the reason; the assembly pipeline
//! itself never sees transport errors.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::AppError;

/// Why the chunk source stopped delivering a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum TransportFailure {
    /// The backend rejected the request as unauthenticated (HTTP 401).
    Unauthorized,
    /// The backend answered with a non-success status.
    Status(u16),
    /// The response carried no body to stream from.
    MissingBody,
    /// Connection or read failure while streaming.
    Network(String),
}

impl TransportFailure {
    /// Classify an HTTP status code; `None` for 2xx.
    #[must_use]
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            401 => Some(Self::Unauthorized),
            other => Some(Self::Status(other)),
        }
    }

    /// Classify an I/O error raised while reading the body.
    #[must_use]
    pub fn from_io(err: &std::io::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl Display for TransportFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("authentication required"),
            Self::Status(code) => write!(f, "bad response: status {code}"),
            Self::MissingBody => f.write_str("no response body"),
            Self::Network(msg) => write!(f, "network: {msg}"),
        }
    }
}

impl From<TransportFailure> for AppError {
    fn from(failure: TransportFailure) -> Self {
        Self::Transport(failure.to_string())
    }
}
