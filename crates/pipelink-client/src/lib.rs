//! pipelink client library entry.
//!
//! This crate wires the transport, connection worker, dispatch layer and
//! command/event bridge into one `Engine`. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod backoff;
pub mod bridge;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod engine;
pub mod transport;

pub use bridge::{Event, EventKind, ReadyConfig, ReadyInfo, Request, User};
pub use connection::ConnectionState;
pub use engine::Engine;
