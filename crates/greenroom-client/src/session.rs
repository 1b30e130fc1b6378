//! Two-actor chat session orchestration.
//!
//! Startup sequence: start the domain actor, ask it which conversation
//! actor it wraps, optionally kick off the automated opening turn, then
//! subscribe to the conversation actor's channel. The first failing step
//! aborts the sequence; an already-started domain actor is stopped
//! best-effort so the Runtime is not left running an orphan.
//!
//! Steady state splits the two directions: user input goes to the domain
//! actor (which may enrich it before the conversation actor sees it), and
//! rendered output arrives only through the conversation actor's channel.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use greenroom_core::protocol::{ChatMessage, ChatReply, ChatRequest};
use greenroom_core::{ClientError, Result};

use crate::channel::{ChannelObserver, ChannelStream, StreamOptions, Subscription};
use crate::config::ClientConfig;
use crate::ops::{self, CommandClient};

/// A running session: the domain actor, its conversation actor, and the
/// open channel subscription. The two actor ids are always distinct.
pub struct ChatSession {
    client: CommandClient,
    domain_actor_id: String,
    stream: ChannelStream,
}

impl ChatSession {
    /// Run the full startup sequence against the configured Runtime.
    pub async fn start(cfg: &ClientConfig) -> Result<Self> {
        let client = CommandClient::from_config(cfg);
        info!(runtime = %client.endpoint().addr(), "starting session");

        let domain_actor_id = match client
            .start_actor(&cfg.actor.manifest, &cfg.actor.initial_state)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(step = "start_domain_actor", error = %e, "session startup failed");
                return Err(e);
            }
        };
        info!(domain = %domain_actor_id, "domain actor started");

        let chat_actor_id = match resolve_chat_actor(&client, &domain_actor_id).await {
            Ok(id) => id,
            Err(e) => {
                error!(step = "resolve_chat_actor", error = %e, "session startup failed");
                stop_quietly(&client, &domain_actor_id).await;
                return Err(e);
            }
        };
        info!(chat = %chat_actor_id, "conversation actor resolved");

        if cfg.workflow.auto_start {
            if let Err(e) = start_workflow(&client, &domain_actor_id).await {
                error!(step = "start_workflow", error = %e, "session startup failed");
                stop_quietly(&client, &domain_actor_id).await;
                return Err(e);
            }
        }

        let stream = match ChannelStream::open(
            &client,
            &chat_actor_id,
            StreamOptions::from_config(cfg),
        )
        .await
        {
            Ok(stream) => stream,
            Err(e) => {
                error!(step = "open_channel", error = %e, "session startup failed");
                stop_quietly(&client, &domain_actor_id).await;
                return Err(e);
            }
        };
        info!(domain = %domain_actor_id, chat = %chat_actor_id, "session ready");

        Ok(Self {
            client,
            domain_actor_id,
            stream,
        })
    }

    pub fn domain_actor_id(&self) -> &str {
        &self.domain_actor_id
    }

    /// The conversation actor is whatever the channel is subscribed to.
    pub fn chat_actor_id(&self) -> &str {
        self.stream.actor_id()
    }

    pub fn stream(&self) -> &ChannelStream {
        &self.stream
    }

    /// Subscribe to the conversation actor's output.
    pub fn subscribe(&self, observer: Arc<dyn ChannelObserver>) -> Subscription {
        self.stream.subscribe(observer)
    }

    /// Submit one user message to the domain actor. The reply only
    /// acknowledges receipt; generated output arrives via the subscription.
    pub async fn send_message(&self, content: &str) -> Result<()> {
        let message = ChatMessage::user(content, ops::unix_millis());
        let request = ops::chat_request_value(&ChatRequest::AddMessage { message })?;
        let reply = self
            .client
            .request_actor_message(&self.domain_actor_id, &request)
            .await?;
        ops::expect_success(reply, "AddMessage")
    }

    /// Trigger the domain actor's automated opening turn. Also runs during
    /// [`start`](Self::start) when `workflow.auto_start` is set.
    pub async fn start_workflow(&self) -> Result<()> {
        start_workflow(&self.client, &self.domain_actor_id).await
    }

    /// End the session: close the channel subscription, then stop the
    /// domain actor best-effort.
    pub async fn shutdown(mut self) {
        self.stream.close().await;
        stop_quietly(&self.client, &self.domain_actor_id).await;
        info!(domain = %self.domain_actor_id, "session shut down");
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("domain_actor_id", &self.domain_actor_id)
            .field("chat_actor_id", &self.chat_actor_id())
            .finish_non_exhaustive()
    }
}

/// Ask the domain actor which conversation actor it wraps. Anything but a
/// well-formed `ChatStateActorId` naming a *different* actor is a sequencing
/// failure.
pub async fn resolve_chat_actor(client: &CommandClient, domain_actor_id: &str) -> Result<String> {
    let request = ops::chat_request_value(&ChatRequest::GetChatStateActorId)?;
    let reply = client
        .request_actor_message(domain_actor_id, &request)
        .await?;
    let actor_id = match serde_json::from_value::<ChatReply>(reply) {
        Ok(ChatReply::ChatStateActorId { actor_id }) => actor_id,
        _ => {
            return Err(ClientError::Sequence(
                "invalid response from domain actor".into(),
            ))
        }
    };
    if actor_id == domain_actor_id {
        return Err(ClientError::Sequence(
            "domain actor and conversation actor must be distinct".into(),
        ));
    }
    Ok(actor_id)
}

async fn start_workflow(client: &CommandClient, domain_actor_id: &str) -> Result<()> {
    let request = ops::chat_request_value(&ChatRequest::StartChat)?;
    let reply = client
        .request_actor_message(domain_actor_id, &request)
        .await?;
    ops::expect_success(reply, "StartChat")?;
    info!(domain = domain_actor_id, "workflow started");
    Ok(())
}

/// Best-effort stop for cleanup paths; failures are logged, not propagated.
async fn stop_quietly(client: &CommandClient, actor_id: &str) {
    if let Err(e) = client.stop_actor(actor_id).await {
        warn!(actor = actor_id, error = %e, "failed to stop actor during cleanup");
    }
}
