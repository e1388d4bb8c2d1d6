//! Connection state machine.
//!
//! One worker task owns the transport and is the only writer of state,
//! backoff and the pending table. Transitions:
//! - `Disconnected -> Connecting` when an endpoint slot accepts.
//! - `Connecting -> ConnectedPendingReady` once the handshake is written.
//! - `ConnectedPendingReady -> Connected` on Ready (backoff reset).
//! - any state `-> Disconnected` on transport error, corrupt frame or peer
//!   close, after a `Close` event is queued.
//! - `Connected -> Disconnecting -> Disconnected` on shutdown (terminal).

pub mod state;
pub(crate) mod worker;

pub use state::ConnectionState;
