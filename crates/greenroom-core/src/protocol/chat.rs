//! Domain-actor sub-protocol.
//!
//! Requests and replies ride inside `RequestActorMessage.data` /
//! `RequestedMessage.message` as UTF-8 JSON, internally tagged on `type`.
//! Both the domain actor (which enriches user input) and the conversation
//! actor (which stores messages and generates completions) speak this shape.

use serde::{Deserialize, Serialize};

/// Message roles understood by conversation actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One chat message as conversation actors store it. `timestamp` is
/// milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: u64,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, timestamp: u64) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
        }
    }
}

/// Requests the client sends through `RequestActorMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatRequest {
    /// Ask a domain actor which conversation actor it wraps.
    GetChatStateActorId,
    /// Append a message to the conversation.
    AddMessage { message: ChatMessage },
    /// Kick off the domain actor's automated opening turn.
    StartChat,
    /// Ask a conversation actor to produce the next completion.
    GenerateCompletion,
}

/// Replies actors send back for [`ChatRequest`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatReply {
    ChatStateActorId { actor_id: String },
    Success,
}
