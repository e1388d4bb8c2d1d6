//! pipelink core: runtime-free protocol primitives and the shared error type.
//!
//! This crate defines the wire-level contracts spoken with the local presence
//! peer: the 8-byte framed binary codec, the JSON payload envelope, and the
//! closed command/event vocabularies. It carries no runtime or transport
//! dependencies so the codec can be driven from blocking readers, async
//! transports, and tests alike.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed frames surface as `PipeLinkError` so a hostile or broken peer can
//! only ever cost us the current connection.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorCode, PipeLinkError, Result};
