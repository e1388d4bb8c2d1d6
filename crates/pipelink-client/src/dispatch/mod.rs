//! Inbound frame routing.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, Routed};
