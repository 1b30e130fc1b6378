//! Top-level facade crate for greenroom.
//!
//! Re-exports the protocol core and the client engine so users can depend on a single crate.

pub mod core {
    pub use greenroom_core::*;
}

pub mod client {
    pub use greenroom_client::*;
}
