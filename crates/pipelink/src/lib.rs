//! Top-level facade crate for pipelink.
//!
//! Re-exports the protocol primitives and the connection engine so users can
//! depend on a single crate.

pub mod core {
    pub use pipelink_core::*;
}

pub mod client {
    pub use pipelink_client::*;
}

pub use pipelink_client::{ConnectionState, Engine, Event, EventKind, Request};
