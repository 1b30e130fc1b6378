//! One socket, one outstanding request.
//!
//! A [`Connection`] owns a single TCP socket to the Runtime. The protocol
//! carries no request ids, so pairing relies on discipline: exactly one
//! request may be in flight per connection, and a second [`send`] before the
//! matching [`receive`] resolves is rejected. Never share one connection
//! across concurrent logical operations.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use greenroom_core::protocol::{encode_frame, FrameDecoder, Response};
use greenroom_core::{ClientError, Result};

/// Runtime address, as the config names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A live socket plus its frame decoder and request-pairing state.
pub struct Connection {
    addr: String,
    stream: Option<TcpStream>,
    decoder: FrameDecoder,
    read_buf: BytesMut,
    receive_timeout: Duration,
    in_flight: bool,
}

impl Connection {
    /// Open a socket to the Runtime. Fails with a transport error if the
    /// connect attempt errors or exceeds `connect_timeout`.
    pub async fn connect(
        endpoint: &Endpoint,
        connect_timeout: Duration,
        receive_timeout: Duration,
    ) -> Result<Self> {
        let addr = endpoint.addr();
        let attempt = tokio::time::timeout(connect_timeout, TcpStream::connect(&addr)).await;
        let stream = match attempt {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                return Err(ClientError::Connect {
                    addr,
                    source: e,
                })
            }
            Err(_) => {
                return Err(ClientError::Connect {
                    addr,
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("no connection within {connect_timeout:?}"),
                    ),
                })
            }
        };
        debug!(%addr, "connected to runtime");
        Ok(Self {
            addr,
            stream: Some(stream),
            decoder: FrameDecoder::new(),
            read_buf: BytesMut::with_capacity(8 * 1024),
            receive_timeout,
            in_flight: false,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Write one command payload as a single frame.
    ///
    /// Rejects with [`ClientError::RequestInFlight`] while a previous request
    /// still awaits its response.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        if self.in_flight {
            return Err(ClientError::RequestInFlight);
        }
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        let frame = encode_frame(payload)?;
        stream.write_all(&frame).await?;
        self.in_flight = true;
        trace!(addr = %self.addr, bytes = frame.len(), "frame sent");
        Ok(())
    }

    /// Read the next response, bounded by the connection's receive timeout.
    ///
    /// Generation can be slow, so the bound is generous; on expiry the
    /// connection is closed and unusable. Call again after a successful
    /// return to drain further frames already buffered.
    pub async fn receive(&mut self) -> Result<Response> {
        let deadline = tokio::time::Instant::now() + self.receive_timeout;
        self.receive_inner(Some(deadline)).await
    }

    /// Read the next response with no deadline. Channel listeners sit idle
    /// between turns for arbitrarily long; only socket close or error ends
    /// the wait.
    pub async fn receive_unbounded(&mut self) -> Result<Response> {
        self.receive_inner(None).await
    }

    async fn receive_inner(&mut self, deadline: Option<tokio::time::Instant>) -> Result<Response> {
        loop {
            if let Some(payload) = self.decoder.next_payload()? {
                self.in_flight = false;
                return Response::from_payload(&payload);
            }
            let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
            let read = stream.read_buf(&mut self.read_buf);
            let result = match deadline {
                Some(at) => tokio::time::timeout_at(at, read).await,
                None => Ok(read.await),
            };
            let n = match result {
                Ok(Ok(n)) => n,
                // A read error or an expired deadline leaves the socket
                // unusable.
                Ok(Err(e)) => {
                    self.close().await;
                    return Err(e.into());
                }
                Err(_) => {
                    let waited = self.receive_timeout;
                    self.close().await;
                    return Err(ClientError::Timeout(waited));
                }
            };
            if n == 0 {
                self.close().await;
                return Err(ClientError::ConnectionClosed);
            }
            self.decoder.push(&self.read_buf);
            self.read_buf.clear();
        }
    }

    /// Half-close the socket. Safe to call more than once.
    pub async fn close(&mut self) {
        self.in_flight = false;
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                trace!(addr = %self.addr, error = %e, "socket shutdown failed");
            }
            debug!(addr = %self.addr, "connection closed");
        }
    }
}
