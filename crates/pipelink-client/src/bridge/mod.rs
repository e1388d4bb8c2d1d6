//! Application <-> worker bridge.
//!
//! - `CommandQueue`: many producers (application), one consumer (worker).
//! - `EventQueue`: one producer (worker), application consumers.
//! - `PendingTable`: nonce correlation for in-flight commands.
//!
//! Both queues are bounded and drop their oldest entry when full. Enqueueing
//! never blocks the caller.

pub mod commands;
pub mod events;
pub mod pending;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use commands::{CommandQueue, Request};
pub use events::{Event, EventKind, EventQueue, ReadyConfig, ReadyInfo, User};
pub use pending::{PendingRequest, PendingTable};

/// Queue state is a plain `VecDeque`; a poisoned lock still holds a valid one.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
