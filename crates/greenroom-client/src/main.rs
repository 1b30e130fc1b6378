//! greenroom line-mode driver.
//!
//! Connects to the Runtime described in the config file, starts a chat
//! session, prints every channel message to stdout, and submits each stdin
//! line as a user message. `/quit` (or EOF) ends the session.

use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{fmt, EnvFilter};

use greenroom_core::protocol::ChatMessage;
use greenroom_core::ClientError;

use greenroom_client::channel::ChannelObserver;
use greenroom_client::config;
use greenroom_client::session::ChatSession;

struct StdoutObserver;

impl ChannelObserver for StdoutObserver {
    fn on_message(&self, sender_id: &str, message: &[u8]) {
        match serde_json::from_slice::<ChatMessage>(message) {
            Ok(msg) => println!("[{}] {}: {}", sender_id, msg.role.as_str(), msg.content),
            Err(_) => println!("[{}] {}", sender_id, String::from_utf8_lossy(message)),
        }
    }

    fn on_error(&self, error: &ClientError) {
        eprintln!("channel error: {error}");
    }

    fn on_closed(&self) {
        eprintln!("channel closed");
    }
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "greenroom.yaml".to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");

    let session = ChatSession::start(&cfg).await.expect("session start failed");
    let _printer = session.subscribe(Arc::new(StdoutObserver));
    tracing::info!(
        domain = session.domain_actor_id(),
        chat = session.chat_actor_id(),
        "type a message and press enter; /quit to exit"
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "/quit" {
            break;
        }
        if let Err(e) = session.send_message(text).await {
            tracing::error!(error = %e, "message send failed");
        }
    }

    session.shutdown().await;
}
