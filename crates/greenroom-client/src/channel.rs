//! Durable subscription to one actor's broadcast channel.
//!
//! A [`ChannelStream`] opens a dedicated long-lived connection, runs a
//! receive loop on a spawned task, and fans every `ChannelMessage` out to
//! registered observers. If the loop exits for any reason other than an
//! explicit [`close`](ChannelStream::close), it restarts after a short
//! backoff; a restart attempt that cannot even reconnect gives up and
//! reports through [`ChannelObserver::on_error`].

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use greenroom_core::protocol::{ChannelTarget, ChatMessage, ChatRequest, Command, Response};
use greenroom_core::{ClientError, Result};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::ops::{self, CommandClient};

/// Callbacks for channel traffic. Implementations run on the listener task;
/// keep them quick and never block.
pub trait ChannelObserver: Send + Sync {
    /// Called for every `ChannelMessage`, in Runtime emission order.
    fn on_message(&self, sender_id: &str, message: &[u8]);

    /// The listener hit a failure (socket loss or a Runtime `Error`). The
    /// stream may still restart afterwards; this is a notice, not the end.
    fn on_error(&self, _error: &ClientError) {}

    /// The stream is finished for good: explicit close, or a restart that
    /// could not reconnect. No `on_message` follows this call.
    fn on_closed(&self) {}
}

type Observers = DashMap<u64, Arc<dyn ChannelObserver>>;

/// Unsubscribe handle returned by [`ChannelStream::subscribe`].
///
/// Dropping the handle without calling [`cancel`](Self::cancel) leaves the
/// observer attached for the life of the stream.
pub struct Subscription {
    id: u64,
    observers: Arc<Observers>,
}

impl Subscription {
    pub fn cancel(self) {
        self.observers.remove(&self.id);
    }
}

/// Tunables for the subscription lifecycle.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// How long [`ChannelStream::open`] waits for `ChannelOpened`.
    pub open_timeout: Duration,
    /// Pause before restarting a listener that exited unexpectedly.
    pub restart_backoff: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(10),
            restart_backoff: Duration::from_secs(1),
        }
    }
}

impl StreamOptions {
    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self {
            open_timeout: Duration::from_millis(cfg.client.channel_open_timeout_ms),
            restart_backoff: Duration::from_millis(cfg.client.restart_backoff_ms),
        }
    }
}

/// A live channel subscription. See the module docs for lifecycle rules.
pub struct ChannelStream {
    actor_id: String,
    client: CommandClient,
    observers: Arc<Observers>,
    next_observer: AtomicU64,
    channel_id: watch::Receiver<Option<String>>,
    open: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl ChannelStream {
    /// Subscribe to `actor_id`'s channel and wait until the Runtime confirms
    /// with `ChannelOpened`. The open fails when `opts.open_timeout` elapses
    /// first, or when the listener gives up before confirming; the listener
    /// is torn down again in either case.
    pub async fn open(client: &CommandClient, actor_id: &str, opts: StreamOptions) -> Result<Self> {
        let mut conn = client.open_connection().await?;
        send_open(&mut conn, actor_id).await?;

        let observers: Arc<Observers> = Arc::new(DashMap::new());
        let (id_tx, id_rx) = watch::channel(None);
        let open = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());

        let worker = ListenWorker {
            client: client.clone(),
            actor_id: actor_id.to_string(),
            observers: Arc::clone(&observers),
            channel_id: id_tx,
            open: Arc::clone(&open),
            shutdown: Arc::clone(&shutdown),
            restart_backoff: opts.restart_backoff,
        };
        let task = tokio::spawn(worker.run(conn));

        let mut stream = Self {
            actor_id: actor_id.to_string(),
            client: client.clone(),
            observers,
            next_observer: AtomicU64::new(1),
            channel_id: id_rx,
            open,
            shutdown,
            task: Some(task),
        };

        let mut confirm = stream.channel_id.clone();
        let opened = tokio::time::timeout(opts.open_timeout, async move {
            while confirm.borrow_and_update().is_none() {
                if confirm.changed().await.is_err() {
                    return false;
                }
            }
            true
        })
        .await;

        match opened {
            Ok(true) => Ok(stream),
            // The watch sender dropped, so the listener already gave up
            // (for example the restart path could not reconnect).
            Ok(false) => {
                stream.close().await;
                Err(ClientError::Sequence(
                    "channel listener exited before open was confirmed".into(),
                ))
            }
            Err(_) => {
                stream.close().await;
                Err(ClientError::Sequence(
                    "channel failed to open within timeout".into(),
                ))
            }
        }
    }

    /// Register an observer. Observers added while the stream is live start
    /// receiving from the next message; delivery order follows Runtime
    /// emission order for every observer independently.
    pub fn subscribe(&self, observer: Arc<dyn ChannelObserver>) -> Subscription {
        let id = self.next_observer.fetch_add(1, Ordering::Relaxed);
        self.observers.insert(id, observer);
        Subscription {
            id,
            observers: Arc::clone(&self.observers),
        }
    }

    /// Channel id announced by the Runtime, once `ChannelOpened` has been
    /// seen. A restart may replace it.
    pub fn channel_id(&self) -> Option<String> {
        self.channel_id.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Submit user text to the subscribed actor: `AddMessage` then
    /// `GenerateCompletion`, both on one ephemeral connection, both of which
    /// must be acknowledged. The generated output arrives back through the
    /// subscription, not as a return value.
    pub async fn send_message(&self, content: &str) -> Result<()> {
        let message = ChatMessage::user(content, ops::unix_millis());
        let add = ops::chat_request_value(&ChatRequest::AddMessage { message })?;
        let generate = ops::chat_request_value(&ChatRequest::GenerateCompletion)?;

        let mut conn = self.client.open_connection().await?;
        let outcome = async {
            let reply = ops::request_on(&mut conn, &self.actor_id, &add).await?;
            ops::expect_success(reply, "AddMessage")?;
            let reply = ops::request_on(&mut conn, &self.actor_id, &generate).await?;
            ops::expect_success(reply, "GenerateCompletion")
        }
        .await;
        conn.close().await;
        outcome
    }

    /// Stop the listener and wait for it to finish. No observer callback
    /// fires after this returns. Safe to call more than once.
    pub async fn close(&mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            if task.await.is_err() {
                warn!(actor = %self.actor_id, "channel listener task panicked");
            }
        }
    }
}

impl fmt::Debug for ChannelStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelStream")
            .field("actor_id", &self.actor_id)
            .field("channel_id", &self.channel_id())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Drop for ChannelStream {
    /// A stream dropped without [`close`](ChannelStream::close) must not
    /// leave its listener task running.
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn send_open(conn: &mut Connection, actor_id: &str) -> Result<()> {
    let cmd = Command::OpenChannel {
        actor_id: ChannelTarget::Actor(actor_id.to_string()),
        initial_message: Vec::new(),
    };
    conn.send(&cmd.to_payload()?).await
}

enum LoopExit {
    /// `close()` was called.
    Shutdown,
    /// The Runtime sent `ChannelClosed`.
    Closed,
    /// Socket failure or a Runtime `Error` frame.
    Failed(ClientError),
}

/// State owned by the spawned listener task.
struct ListenWorker {
    client: CommandClient,
    actor_id: String,
    observers: Arc<Observers>,
    channel_id: watch::Sender<Option<String>>,
    open: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    restart_backoff: Duration,
}

impl ListenWorker {
    async fn run(self, mut conn: Connection) {
        loop {
            let exit = self.listen(&mut conn).await;
            conn.close().await;
            self.open.store(false, Ordering::SeqCst);

            match exit {
                LoopExit::Shutdown => break,
                LoopExit::Closed => {
                    info!(actor = %self.actor_id, "channel closed by runtime, restarting");
                }
                LoopExit::Failed(e) => {
                    warn!(actor = %self.actor_id, error = %e, "channel listener failed");
                    self.notify_error(&e);
                }
            }

            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = tokio::time::sleep(self.restart_backoff) => {}
            }

            match self.reopen().await {
                Ok(next) => {
                    conn = next;
                    info!(actor = %self.actor_id, "channel listener restarted");
                }
                Err(e) => {
                    error!(actor = %self.actor_id, error = %e, "channel restart failed, giving up");
                    self.notify_error(&e);
                    break;
                }
            }
        }
        self.notify_closed();
    }

    async fn listen(&self, conn: &mut Connection) -> LoopExit {
        loop {
            let received = tokio::select! {
                _ = self.shutdown.notified() => return LoopExit::Shutdown,
                r = conn.receive_unbounded() => r,
            };
            match received {
                Ok(Response::ChannelOpened { channel_id }) => {
                    info!(actor = %self.actor_id, channel = %channel_id, "channel opened");
                    self.open.store(true, Ordering::SeqCst);
                    let _ = self.channel_id.send(Some(channel_id));
                }
                Ok(Response::ChannelMessage { sender_id, message }) => {
                    self.dispatch(&sender_id, &message);
                }
                Ok(Response::ChannelClosed {}) => return LoopExit::Closed,
                Ok(Response::Error(payload)) => {
                    return LoopExit::Failed(ClientError::Runtime(payload))
                }
                Ok(other) => {
                    debug!(variant = other.name(), "ignoring frame on channel");
                }
                Err(e) => return LoopExit::Failed(e),
            }
        }
    }

    /// Deliver to a snapshot of the registry so observers may subscribe or
    /// cancel during dispatch. A panicking observer is logged and skipped,
    /// never allowed to take the listener down.
    fn dispatch(&self, sender_id: &str, message: &[u8]) {
        let snapshot: Vec<Arc<dyn ChannelObserver>> =
            self.observers.iter().map(|e| Arc::clone(e.value())).collect();
        for observer in snapshot {
            let delivered = catch_unwind(AssertUnwindSafe(|| {
                observer.on_message(sender_id, message);
            }));
            if delivered.is_err() {
                warn!(actor = %self.actor_id, "channel observer panicked in on_message");
            }
        }
    }

    fn notify_error(&self, error: &ClientError) {
        let snapshot: Vec<Arc<dyn ChannelObserver>> =
            self.observers.iter().map(|e| Arc::clone(e.value())).collect();
        for observer in snapshot {
            let delivered = catch_unwind(AssertUnwindSafe(|| {
                observer.on_error(error);
            }));
            if delivered.is_err() {
                warn!(actor = %self.actor_id, "channel observer panicked in on_error");
            }
        }
    }

    fn notify_closed(&self) {
        let snapshot: Vec<Arc<dyn ChannelObserver>> =
            self.observers.iter().map(|e| Arc::clone(e.value())).collect();
        for observer in snapshot {
            let delivered = catch_unwind(AssertUnwindSafe(|| {
                observer.on_closed();
            }));
            if delivered.is_err() {
                warn!(actor = %self.actor_id, "channel observer panicked in on_closed");
            }
        }
    }

    async fn reopen(&self) -> Result<Connection> {
        let mut conn = self.client.open_connection().await?;
        send_open(&mut conn, &self.actor_id).await?;
        Ok(conn)
    }
}
