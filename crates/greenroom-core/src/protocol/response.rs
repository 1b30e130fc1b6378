//! Inbound Runtime replies.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// A reply frame from the Runtime, externally tagged on the wire.
///
/// `Error` carries whatever payload the Runtime produced; it is forwarded
/// verbatim so a presentation layer can render it, never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    ActorStarted {
        id: String,
    },
    RequestedMessage {
        id: String,
        message: Vec<u8>,
    },
    ChannelOpened {
        channel_id: String,
    },
    ChannelMessage {
        sender_id: String,
        message: Vec<u8>,
    },
    ChannelClosed {},
    ActorList {
        actors: Vec<serde_json::Value>,
    },
    ActorStatus {
        status: serde_json::Value,
    },
    ActorStopped {},
    Error(serde_json::Value),
}

impl Response {
    /// Parse a frame payload into a response.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| ClientError::Codec(format!("response decode failed: {e}")))
    }

    /// Serialize to a frame payload (the server side of the wire; test
    /// harnesses rely on this for scripted runtimes).
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| ClientError::Codec(format!("response encode failed: {e}")))
    }

    /// Variant name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Response::ActorStarted { .. } => "ActorStarted",
            Response::RequestedMessage { .. } => "RequestedMessage",
            Response::ChannelOpened { .. } => "ChannelOpened",
            Response::ChannelMessage { .. } => "ChannelMessage",
            Response::ChannelClosed {} => "ChannelClosed",
            Response::ActorList { .. } => "ActorList",
            Response::ActorStatus { .. } => "ActorStatus",
            Response::ActorStopped {} => "ActorStopped",
            Response::Error(_) => "Error",
        }
    }
}
