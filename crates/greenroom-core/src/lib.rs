//! greenroom core: transport-agnostic wire protocol for an actor-hosting
//! Runtime.
//!
//! This crate defines the frame codec, the command/response model, the chat
//! sub-protocol, and the error surface shared by the client engine. It
//! intentionally carries no socket or async-runtime dependencies so the
//! protocol can be exercised in tests without I/O.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `ClientError`/`Result` so a client
//! process never crashes on malformed Runtime traffic.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ClientError, ErrorKind, Result};
