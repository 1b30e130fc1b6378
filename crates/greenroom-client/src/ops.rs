//! One-shot Runtime operations.
//!
//! Every operation opens its own [`Connection`], performs one send/receive
//! sequence, and closes the connection on every exit path. The Runtime may
//! interleave unrelated status frames into a reply stream, so the start and
//! request operations skip variants they do not recognize; the list, status,
//! and stop operations treat anything but their success variant (or `Error`)
//! as a protocol violation.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use greenroom_core::protocol::{ChatReply, ChatRequest, Command, Response};
use greenroom_core::{ClientError, Result};

use crate::config::ClientConfig;
use crate::connection::{Connection, Endpoint};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(120);

/// Issues one-shot operations against the Runtime, one connection each.
#[derive(Debug, Clone)]
pub struct CommandClient {
    endpoint: Endpoint,
    connect_timeout: Duration,
    receive_timeout: Duration,
}

impl CommandClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self::new(Endpoint::new(cfg.runtime.host.clone(), cfg.runtime.port))
            .with_connect_timeout(Duration::from_millis(cfg.client.connect_timeout_ms))
            .with_receive_timeout(Duration::from_millis(cfg.client.receive_timeout_ms))
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) async fn open_connection(&self) -> Result<Connection> {
        Connection::connect(&self.endpoint, self.connect_timeout, self.receive_timeout).await
    }

    /// Start an actor from a manifest. `initial_state` is serialized to JSON
    /// and sent as raw bytes; the Runtime hands it to the actor untouched.
    pub async fn start_actor(&self, manifest: &str, initial_state: &Value) -> Result<String> {
        let state = serde_json::to_vec(initial_state)
            .map_err(|e| ClientError::Codec(format!("initial state encode failed: {e}")))?;
        let cmd = Command::StartActor {
            manifest: manifest.to_string(),
            initial_state: state,
            parent: false,
            subscribe: false,
        };
        let id = self
            .one_shot(cmd, |resp| match resp {
                Response::ActorStarted { id } => Ok(Some(id)),
                other => skip(other),
            })
            .await?;
        debug!(actor = %id, manifest, "actor started");
        Ok(id)
    }

    /// Request/response exchange with one actor. The request is serialized
    /// to JSON bytes and the reply bytes are parsed back to JSON.
    pub async fn request_actor_message(&self, id: &str, request: &Value) -> Result<Value> {
        let cmd = Command::RequestActorMessage {
            id: id.to_string(),
            data: encode_actor_request(request)?,
        };
        self.one_shot(cmd, |resp| match resp {
            Response::RequestedMessage { message, .. } => decode_actor_reply(&message).map(Some),
            other => skip(other),
        })
        .await
    }

    pub async fn list_actors(&self) -> Result<Vec<Value>> {
        self.one_shot(Command::ListActors {}, |resp| match resp {
            Response::ActorList { actors } => Ok(Some(actors)),
            other => unexpected("ListActors", &other),
        })
        .await
    }

    pub async fn get_actor_status(&self, id: &str) -> Result<Value> {
        let cmd = Command::GetActorStatus { id: id.to_string() };
        self.one_shot(cmd, |resp| match resp {
            Response::ActorStatus { status } => Ok(Some(status)),
            other => unexpected("GetActorStatus", &other),
        })
        .await
    }

    pub async fn stop_actor(&self, id: &str) -> Result<()> {
        let cmd = Command::StopActor { id: id.to_string() };
        self.one_shot(cmd, |resp| match resp {
            Response::ActorStopped {} => Ok(Some(())),
            other => unexpected("StopActor", &other),
        })
        .await?;
        debug!(actor = id, "actor stopped");
        Ok(())
    }

    /// Open, send, classify replies until done, close. The connection is
    /// closed whatever the outcome.
    async fn one_shot<T>(
        &self,
        cmd: Command,
        mut classify: impl FnMut(Response) -> Result<Option<T>>,
    ) -> Result<T> {
        let mut conn = self.open_connection().await?;
        let outcome = async {
            conn.send(&cmd.to_payload()?).await?;
            loop {
                match conn.receive().await? {
                    Response::Error(payload) => return Err(ClientError::Runtime(payload)),
                    other => {
                        if let Some(value) = classify(other)? {
                            return Ok(value);
                        }
                    }
                }
            }
        }
        .await;
        conn.close().await;
        outcome
    }
}

fn skip<T>(resp: Response) -> Result<Option<T>> {
    debug!(variant = resp.name(), "ignoring unrelated response frame");
    Ok(None)
}

fn unexpected<T>(op: &'static str, resp: &Response) -> Result<Option<T>> {
    Err(ClientError::UnexpectedResponse {
        op,
        got: resp.name(),
    })
}

pub(crate) fn encode_actor_request(request: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(request)
        .map_err(|e| ClientError::Codec(format!("actor request encode failed: {e}")))
}

pub(crate) fn chat_request_value(request: &ChatRequest) -> Result<Value> {
    serde_json::to_value(request)
        .map_err(|e| ClientError::Codec(format!("chat request encode failed: {e}")))
}

pub(crate) fn decode_actor_reply(message: &[u8]) -> Result<Value> {
    serde_json::from_slice(message)
        .map_err(|e| ClientError::Codec(format!("actor reply is not valid json: {e}")))
}

/// Interpret a domain-actor reply that must acknowledge with
/// `{"type": "Success"}`.
pub(crate) fn expect_success(reply: Value, op: &str) -> Result<()> {
    match serde_json::from_value::<ChatReply>(reply) {
        Ok(ChatReply::Success) => Ok(()),
        Ok(other) => Err(ClientError::Sequence(format!(
            "{op} was not acknowledged: got {other:?}"
        ))),
        Err(_) => Err(ClientError::Sequence(format!(
            "{op} was not acknowledged: invalid response from domain actor"
        ))),
    }
}

/// Run one request/reply exchange on an already-open connection. Used where
/// several exchanges must share a single connection.
pub(crate) async fn request_on(conn: &mut Connection, id: &str, request: &Value) -> Result<Value> {
    let cmd = Command::RequestActorMessage {
        id: id.to_string(),
        data: encode_actor_request(request)?,
    };
    conn.send(&cmd.to_payload()?).await?;
    loop {
        match conn.receive().await? {
            Response::Error(payload) => return Err(ClientError::Runtime(payload)),
            Response::RequestedMessage { message, .. } => return decode_actor_reply(&message),
            other => {
                debug!(variant = other.name(), "ignoring unrelated response frame");
            }
        }
    }
}

pub(crate) fn unix_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
