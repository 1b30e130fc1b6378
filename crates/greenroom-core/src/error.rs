//! Shared error type across greenroom crates.

use std::time::Duration;

use thiserror::Error;

/// Coarse failure classes (stable API).
///
/// Callers that only need to branch on "what went wrong" (retry, surface,
/// abort) should match on the kind rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Socket-level failure: connect, read, write, timeout, early close.
    Transport,
    /// Wire-format violation: bad frame, bad JSON, unsupported envelope,
    /// response shape the operation cannot accept.
    Protocol,
    /// An `Error` reply returned by the Runtime itself.
    Runtime,
    /// A well-formed reply that breaks the session contract.
    Sequence,
}

impl ErrorKind {
    /// String representation used in logs and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Protocol => "PROTOCOL",
            ErrorKind::Runtime => "RUNTIME",
            ErrorKind::Sequence => "SEQUENCE",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Unified error type used by the protocol core and the client engine.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not connected")]
    NotConnected,
    #[error("connection closed before a response arrived")]
    ConnectionClosed,
    #[error("no response from the runtime within {0:?}")]
    Timeout(Duration),
    #[error("a request is already in flight on this connection")]
    RequestInFlight,
    #[error("frame codec: {0}")]
    Codec(String),
    #[error("fragment reassembly unsupported")]
    FragmentUnsupported,
    #[error("unknown frame type")]
    UnknownFrame,
    #[error("unexpected response to {op}: {got}")]
    UnexpectedResponse { op: &'static str, got: &'static str },
    #[error("runtime error: {0}")]
    Runtime(serde_json::Value),
    #[error("{0}")]
    Sequence(String),
}

impl ClientError {
    /// Map an error to its stable failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Connect { .. }
            | ClientError::Io(_)
            | ClientError::NotConnected
            | ClientError::ConnectionClosed
            | ClientError::Timeout(_) => ErrorKind::Transport,
            ClientError::RequestInFlight
            | ClientError::Codec(_)
            | ClientError::FragmentUnsupported
            | ClientError::UnknownFrame
            | ClientError::UnexpectedResponse { .. } => ErrorKind::Protocol,
            ClientError::Runtime(_) => ErrorKind::Runtime,
            ClientError::Sequence(_) => ErrorKind::Sequence,
        }
    }
}
