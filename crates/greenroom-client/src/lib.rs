//! greenroom client engine.
//!
//! This crate wires the connection discipline, one-shot Runtime operations,
//! channel subscriptions, and the chat session orchestrator into a cohesive
//! client stack. It is intended to be consumed by the binary (`main.rs`),
//! by integration tests, and by any presentation layer built on top.

pub mod channel;
pub mod config;
pub mod connection;
pub mod ops;
pub mod session;
