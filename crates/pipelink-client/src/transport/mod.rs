//! Pipe transport seam.
//!
//! The worker owns exactly one transport and is its only caller, so the trait
//! takes `&mut self` and needs no internal locking.
//! - `connect(slot)` resolves the slot to an endpoint and opens it.
//! - `read_frame()` is a bounded wait: `WouldBlock` when nothing arrived in
//!   time. It must be cancel-safe: the worker selects it against shutdown and
//!   wraps it in a zero timeout while commands are waiting.
//! - `write_frame()` writes one whole frame or fails.

pub mod endpoints;
#[cfg(unix)]
pub mod unix;

use async_trait::async_trait;

use pipelink_core::error::Result;
use pipelink_core::protocol::Frame;

pub use endpoints::{EndpointResolver, ENDPOINT_PREFIX};
#[cfg(unix)]
pub use unix::UnixPipeTransport;

/// Result of one bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame(Frame),
    WouldBlock,
}

#[async_trait]
pub trait PipeTransport: Send {
    /// Open the endpoint for `slot`. `false` when nothing is listening there.
    async fn connect(&mut self, slot: u8) -> bool;
    async fn close(&mut self);
    fn is_connected(&self) -> bool;
    async fn read_frame(&mut self) -> Result<ReadOutcome>;
    async fn write_frame(&mut self, frame: &Frame) -> Result<()>;
}
