//! Scripted fake Runtime for integration tests.
//!
//! Binds an ephemeral localhost port and hands every accepted connection to
//! the test's handler together with a zero-based session index, so scripts
//! can behave differently per connection (first channel drops, second one
//! resumes, and so on).

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use greenroom_client::connection::Endpoint;
use greenroom_core::protocol::{encode_frame, Command, FrameDecoder, Response};

/// `RUST_LOG`-controlled output; repeated calls across tests are harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

pub struct FakeRuntime {
    addr: SocketAddr,
    accept: JoinHandle<()>,
}

impl FakeRuntime {
    pub async fn spawn<F, Fut>(handler: F) -> Self
    where
        F: Fn(RuntimeConn, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler = Arc::new(handler);
        let accept = tokio::spawn(async move {
            let mut session = 0usize;
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let handler = Arc::clone(&handler);
                let index = session;
                session += 1;
                tokio::spawn(async move {
                    handler(RuntimeConn::new(stream), index).await;
                });
            }
        });
        Self { addr, accept }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", self.addr.port())
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for FakeRuntime {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

/// One accepted client connection, framed like the real Runtime.
pub struct RuntimeConn {
    stream: TcpStream,
    decoder: FrameDecoder,
}

impl RuntimeConn {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
        }
    }

    /// Next decoded command, or `None` once the client hangs up.
    pub async fn recv_command(&mut self) -> Option<Command> {
        loop {
            match self.decoder.next_payload() {
                Ok(Some(payload)) => return Command::from_payload(&payload).ok(),
                Ok(None) => {}
                Err(_) => return None,
            }
            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await.ok()?;
            if n == 0 {
                return None;
            }
            self.decoder.push(&buf[..n]);
        }
    }

    pub async fn send_response(&mut self, resp: &Response) {
        let frame = encode_frame(&resp.to_payload().unwrap()).unwrap();
        self.stream.write_all(&frame).await.unwrap();
    }

    /// Send one frame in two socket writes with a pause between them, to
    /// exercise the client's partial-frame handling over a real socket.
    pub async fn send_response_split(&mut self, resp: &Response, cut: usize) {
        let frame = encode_frame(&resp.to_payload().unwrap()).unwrap();
        let cut = cut.min(frame.len());
        self.stream.write_all(&frame[..cut]).await.unwrap();
        self.stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.stream.write_all(&frame[cut..]).await.unwrap();
    }

    /// Drop our end of the socket.
    pub async fn shutdown(mut self) {
        let _ = self.stream.shutdown().await;
    }
}
