//! Outbound management commands.
//!
//! Externally tagged on the wire: `{"<CommandName>": {<data>}}`. Actor state
//! and request bodies travel as raw byte arrays whose contents are UTF-8
//! JSON; the Runtime never looks inside them and neither does this layer.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// A management command accepted by the Runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    StartActor {
        manifest: String,
        initial_state: Vec<u8>,
        parent: bool,
        subscribe: bool,
    },
    RequestActorMessage {
        id: String,
        data: Vec<u8>,
    },
    OpenChannel {
        actor_id: ChannelTarget,
        initial_message: Vec<u8>,
    },
    ListActors {},
    GetActorStatus {
        id: String,
    },
    StopActor {
        id: String,
    },
}

/// Channel participant reference. Management clients always address actors;
/// the tag survives on the wire as `{"Actor": "<id>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelTarget {
    Actor(String),
}

impl Command {
    /// Serialize to the JSON payload carried inside a frame envelope.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| ClientError::Codec(format!("command encode failed: {e}")))
    }

    /// Parse a payload back into a command (the server side of the wire;
    /// test harnesses rely on this for scripted runtimes).
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| ClientError::Codec(format!("command decode failed: {e}")))
    }

    /// Operation name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartActor { .. } => "StartActor",
            Command::RequestActorMessage { .. } => "RequestActorMessage",
            Command::OpenChannel { .. } => "OpenChannel",
            Command::ListActors {} => "ListActors",
            Command::GetActorStatus { .. } => "GetActorStatus",
            Command::StopActor { .. } => "StopActor",
        }
    }
}
