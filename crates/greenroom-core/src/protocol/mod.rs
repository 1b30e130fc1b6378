//! Wire protocol for the Runtime's management socket.
//!
//! Three layers, outermost first:
//! - `frame`: `[u32 BE length][JSON envelope]` framing with incremental,
//!   partial-read-safe decoding.
//! - `command` / `response`: the externally tagged operation objects carried
//!   as envelope payloads.
//! - `chat`: the `type`-tagged sub-protocol tunneled through
//!   `RequestActorMessage` byte fields.
//!
//! All parsers are panic-free: malformed input is reported as `ClientError`
//! instead of panicking or indexing raw buffers.

pub mod chat;
pub mod command;
pub mod frame;
pub mod response;

pub use chat::{ChatMessage, ChatReply, ChatRequest, Role};
pub use command::{ChannelTarget, Command};
pub use frame::{encode_frame, Envelope, FrameDecoder};
pub use response::Response;
