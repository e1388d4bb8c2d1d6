//! Application-facing events and the bounded event queue.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Notify;
use tracing::warn;

use pipelink_core::error::ErrorCode;
use pipelink_core::protocol::ServerEvent;

use super::lock;

/// Subscribable event families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Join,
    Spectate,
    JoinRequest,
}

impl EventKind {
    pub fn server_event(self) -> ServerEvent {
        match self {
            EventKind::Join => ServerEvent::ActivityJoin,
            EventKind::Spectate => ServerEvent::ActivitySpectate,
            EventKind::JoinRequest => ServerEvent::ActivityJoinRequest,
        }
    }

    pub fn from_server_event(evt: ServerEvent) -> Option<Self> {
        match evt {
            ServerEvent::ActivityJoin => Some(EventKind::Join),
            ServerEvent::ActivitySpectate => Some(EventKind::Spectate),
            ServerEvent::ActivityJoinRequest => Some(EventKind::JoinRequest),
            _ => None,
        }
    }
}

/// Endpoints the peer advertises in its Ready payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReadyConfig {
    #[serde(default)]
    pub cdn_host: String,
    #[serde(default)]
    pub api_endpoint: String,
    #[serde(default)]
    pub environment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

/// Negotiated session info from the last Ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyInfo {
    pub version: u32,
    pub config: ReadyConfig,
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Ready {
        version: u32,
        config: ReadyConfig,
        user: Option<User>,
    },
    Close {
        code: i64,
        reason: String,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
    /// Echo of a presence update; `presence` is `None` once cleared.
    PresenceUpdate {
        presence: Option<Value>,
        name: String,
        application_id: String,
    },
    Subscribe(EventKind),
    Unsubscribe(EventKind),
    Join {
        secret: String,
    },
    Spectate {
        secret: String,
    },
    JoinRequest {
        user: User,
    },
    ConnectionEstablished {
        slot: u8,
    },
    ConnectionFailed {
        target_slot: Option<u8>,
    },
    TooManyConnectionTries {
        attempts: u32,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Ready { .. } => "ready",
            Event::Close { .. } => "close",
            Event::Error { .. } => "error",
            Event::PresenceUpdate { .. } => "presence_update",
            Event::Subscribe(_) => "subscribe",
            Event::Unsubscribe(_) => "unsubscribe",
            Event::Join { .. } => "join",
            Event::Spectate { .. } => "spectate",
            Event::JoinRequest { .. } => "join_request",
            Event::ConnectionEstablished { .. } => "connection_established",
            Event::ConnectionFailed { .. } => "connection_failed",
            Event::TooManyConnectionTries { .. } => "too_many_connection_tries",
        }
    }

    pub(crate) fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Event::Error {
            code,
            message: message.into(),
        }
    }
}

/// Bounded FIFO of events, in wire arrival order.
pub struct EventQueue {
    inner: Mutex<VecDeque<Event>>,
    capacity: usize,
    notify: Notify,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            notify: Notify::new(),
        }
    }

    pub fn push(&self, event: Event) {
        {
            let mut q = lock(&self.inner);
            if q.len() >= self.capacity {
                if let Some(dropped) = q.pop_front() {
                    warn!(event = dropped.name(), capacity = self.capacity, "event queue full; dropped oldest");
                }
            }
            q.push_back(event);
        }
        self.notify.notify_one();
    }

    pub fn try_pop(&self) -> Option<Event> {
        lock(&self.inner).pop_front()
    }

    pub fn drain(&self) -> Vec<Event> {
        lock(&self.inner).drain(..).collect()
    }

    /// Wait for the next event.
    pub async fn recv(&self) -> Event {
        loop {
            if let Some(event) = self.try_pop() {
                return event;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
