//! Outbound requests and the coalescing command queue.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::{json, Value};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{debug, warn};

use pipelink_core::protocol::{Command, OutboundPayload};

use super::events::EventKind;
use super::lock;

/// Something the application wants sent to the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Publish a presence object. Only the latest queued one is ever sent.
    SetPresence(Value),
    ClearPresence,
    Subscribe(EventKind),
    Unsubscribe(EventKind),
    /// Answer a join request from `user_id`.
    RespondJoin { user_id: String, accept: bool },
    GetVoiceSettings,
    Authorize,
    Authenticate,
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Request::SetPresence(_) | Request::ClearPresence => Command::SetActivity,
            Request::Subscribe(_) => Command::Subscribe,
            Request::Unsubscribe(_) => Command::Unsubscribe,
            Request::RespondJoin { accept: true, .. } => Command::SendActivityJoinInvite,
            Request::RespondJoin { accept: false, .. } => Command::CloseActivityJoinRequest,
            Request::GetVoiceSettings => Command::GetVoiceSettings,
            Request::Authorize => Command::Authorize,
            Request::Authenticate => Command::Authenticate,
        }
    }

    pub fn is_presence(&self) -> bool {
        matches!(self, Request::SetPresence(_))
    }

    /// OAuth requests are in the vocabulary but never go on the wire.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Request::Authorize | Request::Authenticate)
    }

    pub fn to_payload(&self, nonce: String, pid: u32) -> OutboundPayload {
        let (args, evt) = match self {
            Request::SetPresence(activity) => (Some(json!({ "pid": pid, "activity": activity })), None),
            Request::ClearPresence => (Some(json!({ "pid": pid, "activity": null })), None),
            Request::Subscribe(kind) | Request::Unsubscribe(kind) => {
                (None, Some(kind.server_event()))
            }
            Request::RespondJoin { user_id, .. } => (Some(json!({ "user_id": user_id })), None),
            Request::GetVoiceSettings => (Some(json!({})), None),
            Request::Authorize | Request::Authenticate => (None, None),
        };

        OutboundPayload {
            cmd: self.command(),
            nonce: Some(nonce),
            args,
            evt,
        }
    }
}

/// Bounded FIFO of requests with presence coalescing.
pub struct CommandQueue {
    inner: Mutex<VecDeque<Request>>,
    capacity: usize,
    notify: Notify,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            notify: Notify::new(),
        }
    }

    /// Append `req`. A new presence replaces any presence still queued and
    /// moves to the tail, so the last desired presence is what gets sent.
    pub fn push(&self, req: Request) {
        {
            let mut q = lock(&self.inner);
            if req.is_presence() {
                let before = q.len();
                q.retain(|r| !r.is_presence());
                if q.len() < before {
                    debug!("coalesced queued presence");
                }
            }
            if q.len() >= self.capacity {
                if let Some(dropped) = q.pop_front() {
                    warn!(cmd = ?dropped.command(), capacity = self.capacity, "command queue full; dropped oldest");
                }
            }
            q.push_back(req);
        }
        self.notify.notify_one();
    }

    /// Put back a request whose write failed so it goes out first after
    /// reconnecting. A stale presence is discarded if a newer one is queued.
    pub fn requeue(&self, req: Request) {
        let mut q = lock(&self.inner);
        if req.is_presence() && q.iter().any(Request::is_presence) {
            debug!("stale presence superseded; not requeued");
            return;
        }
        if q.len() >= self.capacity {
            warn!(cmd = ?req.command(), "command queue full; failed request not requeued");
            return;
        }
        q.push_front(req);
    }

    /// Put session state back at the head of the queue after a fresh Ready,
    /// keeping `reqs` in order. A replayed presence yields to any presence
    /// change the application queued since, and requests already queued are
    /// not duplicated.
    pub fn restore(&self, reqs: Vec<Request>) {
        let mut q = lock(&self.inner);
        let newer_presence = q
            .iter()
            .any(|r| matches!(r, Request::SetPresence(_) | Request::ClearPresence));
        let mut head = Vec::with_capacity(reqs.len());
        for req in reqs {
            if req.is_presence() && newer_presence {
                debug!("queued presence is newer; replay skipped");
                continue;
            }
            if q.contains(&req) || head.contains(&req) {
                continue;
            }
            head.push(req);
        }
        for req in head.into_iter().rev() {
            if q.len() >= self.capacity {
                warn!(cmd = ?req.command(), "command queue full; replay truncated");
                continue;
            }
            q.push_front(req);
        }
    }

    pub fn pop(&self) -> Option<Request> {
        lock(&self.inner).pop_front()
    }

    /// Drop everything queued. Returns how many requests were discarded.
    pub fn clear(&self) -> usize {
        let mut q = lock(&self.inner);
        let n = q.len();
        q.clear();
        n
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves once a request is pushed (or immediately if one was pushed
    /// since the last wake-up).
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}
