//! Length-prefixed frame codec (panic-free).
//!
//! One frame on the wire is `[u32 big-endian length][JSON bytes]`. The JSON
//! decodes to an [`Envelope`]: `{"Complete": [byte,...]}` carrying a
//! fully-buffered payload, or `{"Fragment": ...}` which the protocol names
//! but this client does not reassemble. The payload bytes are themselves
//! JSON: a command object outbound, a response variant inbound.
//!
//! Parsing rules:
//! - Never index the buffer: length checks before every slice.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.
//! - A partial frame is never discarded; it waits for more bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ClientError, Result};

/// Number of bytes in the length prefix.
pub const LEN_PREFIX: usize = 4;

/// Upper bound on a single frame body. A declared length beyond this is a
/// protocol error rather than an invitation to buffer forever.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Wire envelope around a command/response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Envelope {
    /// Fully-buffered payload bytes.
    Complete(Vec<u8>),
    /// Recognized by the protocol but never reassembled here; decoding one
    /// is reported as [`ClientError::FragmentUnsupported`].
    Fragment(serde_json::Value),
}

/// Encode payload bytes as one complete frame: envelope, then length prefix.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    let envelope = Envelope::Complete(payload.to_vec());
    let body = serde_json::to_vec(&envelope)
        .map_err(|e| ClientError::Codec(format!("envelope encode failed: {e}")))?;
    let len = u32::try_from(body.len())
        .map_err(|_| ClientError::Codec("frame body exceeds u32 length".into()))?;
    let mut out = BytesMut::with_capacity(LEN_PREFIX + body.len());
    out.put_u32(len);
    out.put_slice(&body);
    Ok(out.freeze())
}

/// Unwrap one frame body into its payload bytes.
fn decode_envelope(body: &[u8]) -> Result<Bytes> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ClientError::Codec(format!("invalid frame json: {e}")))?;
    let Some(obj) = value.as_object() else {
        return Err(ClientError::UnknownFrame);
    };
    if obj.len() != 1 {
        return Err(ClientError::UnknownFrame);
    }
    if let Some(bytes) = obj.get("Complete") {
        let payload: Vec<u8> = serde_json::from_value(bytes.clone())
            .map_err(|e| ClientError::Codec(format!("invalid Complete payload: {e}")))?;
        return Ok(Bytes::from(payload));
    }
    if obj.contains_key("Fragment") {
        return Err(ClientError::FragmentUnsupported);
    }
    Err(ClientError::UnknownFrame)
}

/// Incremental decoder for a stream of frames.
///
/// Socket reads arrive in arbitrary chunks; [`push`](Self::push) appends them
/// and [`next_payload`](Self::next_payload) yields the payload of each
/// complete frame in arrival order. Call `next_payload` until it returns
/// `None` to drain every complete frame already buffered.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Append raw bytes read from the socket.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Number of bytes currently buffered (undrained frames and partials).
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pull the next complete frame's payload, or `None` if more bytes are
    /// needed first.
    pub fn next_payload(&mut self) -> Result<Option<Bytes>> {
        if self.buf.len() < LEN_PREFIX {
            return Ok(None);
        }
        // Peek the prefix without consuming it; it stays until the whole
        // body has arrived.
        let declared = {
            let mut peek: &[u8] = &self.buf;
            peek.get_u32() as usize
        };
        if declared > MAX_FRAME_BYTES {
            return Err(ClientError::Codec(format!(
                "declared frame length {declared} exceeds limit {MAX_FRAME_BYTES}"
            )));
        }
        if self.buf.len() < LEN_PREFIX + declared {
            trace!(
                declared,
                buffered = self.buf.len(),
                "partial frame, waiting for more bytes"
            );
            return Ok(None);
        }
        self.buf.advance(LEN_PREFIX);
        let body = self.buf.split_to(declared);
        decode_envelope(&body).map(Some)
    }
}
