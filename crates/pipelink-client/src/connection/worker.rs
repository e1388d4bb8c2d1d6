use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use pipelink_core::error::{ErrorCode, PipeLinkError, Result};
use pipelink_core::protocol::{Frame, Handshake, Opcode, MAX_FRAME_SIZE};

use super::ConnectionState;
use crate::backoff::Backoff;
use crate::bridge::{Event, EventKind, Request};
use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, Routed};
use crate::engine::Shared;
use crate::transport::{PipeTransport, ReadOutcome};

pub(crate) struct Worker<T> {
    cfg: EngineConfig,
    transport: T,
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
    backoff: Backoff,
    state: ConnectionState,
    /// Last nonce handed out. Monotonic for the engine's lifetime.
    nonce: u64,
    handshake_deadline: Option<Instant>,
    /// Last presence written to the peer; replayed after every Ready.
    desired_presence: Option<Value>,
    /// Kinds the peer acknowledged; resubscribed after every Ready.
    subscriptions: BTreeSet<EventKind>,
    shutdown: watch::Receiver<bool>,
}

impl<T: PipeTransport> Worker<T> {
    pub(crate) fn new(
        cfg: EngineConfig,
        transport: T,
        shared: Arc<Shared>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let dispatcher = Dispatcher::new(shared.events.clone(), shared.pending.clone());
        let backoff = Backoff::from_config(&cfg.backoff);
        Self {
            cfg,
            transport,
            shared,
            dispatcher,
            backoff,
            state: ConnectionState::Disconnected,
            nonce: 0,
            handshake_deadline: None,
            desired_presence: None,
            subscriptions: BTreeSet::new(),
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("worker started");
        loop {
            if self.shutdown_requested() {
                self.shutdown_sequence().await;
                break;
            }

            // Connecting and Disconnecting never outlive `connect` and
            // `shutdown_sequence`, so the loop only sees a session or none.
            if self.state == ConnectionState::Disconnected {
                self.connect().await;
            } else if let Err(e) = self.tick().await {
                self.teardown(e.error_code().as_i64(), e.to_string()).await;
            }
        }
        info!("worker stopped");
    }

    /// A dropped engine counts as a shutdown request.
    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(from = self.state.as_str(), to = next.as_str(), "state");
        }
        self.state = next;
        self.shared.status.send_replace(next);
    }

    async fn connect(&mut self) {
        let mut opened = None;
        for slot in self.cfg.connection.slot_order() {
            if self.shutdown_requested() {
                return;
            }
            if self.transport.connect(slot).await {
                opened = Some(slot);
                break;
            }
        }

        let Some(slot) = opened else {
            debug!("no endpoint slot answered");
            self.shared.events.push(Event::ConnectionFailed {
                target_slot: self.cfg.connection.target_slot,
            });
            self.after_failed_attempt().await;
            return;
        };

        info!(slot, "pipe connected");
        self.set_state(ConnectionState::Connecting);
        self.shared.events.push(Event::ConnectionEstablished { slot });

        let sent = match Frame::json(Opcode::Handshake, &Handshake::new(self.cfg.client_id.clone())) {
            Ok(frame) => self.transport.write_frame(&frame).await,
            Err(e) => Err(e),
        };
        match sent {
            Ok(()) => {
                self.handshake_deadline = Some(Instant::now() + self.cfg.connection.handshake_timeout());
                self.set_state(ConnectionState::ConnectedPendingReady);
            }
            Err(e) => {
                warn!(slot, error = %e, "handshake write failed");
                self.teardown(e.error_code().as_i64(), e.to_string()).await;
            }
        }
    }

    async fn after_failed_attempt(&mut self) {
        let delay = self.backoff.next_delay();
        let attempts = self.backoff.failure_count();
        self.shared.set_failures(attempts);
        if attempts == self.cfg.connection.max_connection_attempts {
            warn!(attempts, "too many connection tries");
            self.shared.events.push(Event::TooManyConnectionTries { attempts });
        }
        debug!(attempts, delay_ms = delay.as_millis() as u64, "backing off");
        self.sleep(delay).await;
    }

    /// Sleep that returns early on shutdown.
    async fn sleep(&mut self, delay: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.shutdown.changed() => {}
        }
    }

    /// One connected iteration: at most one write, then one bounded read.
    async fn tick(&mut self) -> Result<()> {
        if self.state == ConnectionState::ConnectedPendingReady {
            if let Some(deadline) = self.handshake_deadline {
                if Instant::now() >= deadline {
                    return Err(PipeLinkError::Timeout("no ready after handshake".into()));
                }
            }
        }

        let mut busy = false;

        if self.state.is_ready() {
            if let Some(req) = self.shared.commands.pop() {
                self.send_request(req).await?;
                busy = true;
            }
        }

        // Don't park on the pipe while writes are waiting.
        let drain = self.state.is_ready() && !self.shared.commands.is_empty();
        let outcome = tokio::select! {
            read = read_next(&mut self.transport, drain) => read?,
            _ = self.shutdown.changed() => return Ok(()),
        };
        if let ReadOutcome::Frame(frame) = outcome {
            trace!(opcode = ?frame.opcode, len = frame.len(), "frame in");
            busy = true;
            self.route(frame).await?;
        }

        if !busy {
            self.idle().await;
        }
        Ok(())
    }

    async fn idle(&mut self) {
        let wait = self.cfg.connection.idle_wait();
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = self.shared.commands.notified() => {}
            _ = self.shutdown.changed() => {}
        }
    }

    async fn send_request(&mut self, req: Request) -> Result<()> {
        let cmd = req.command();
        if !req.is_supported() {
            warn!(?cmd, "request not supported");
            self.shared.events.push(Event::error(
                ErrorCode::NotImplemented,
                format!("{cmd:?} is not supported"),
            ));
            return Ok(());
        }

        self.nonce += 1;
        let nonce = self.nonce.to_string();
        let payload = req.to_payload(nonce.clone(), self.cfg.connection.pid());

        let frame = match Frame::json(Opcode::Frame, &payload) {
            Ok(frame) if frame.len() <= MAX_FRAME_SIZE => frame,
            Ok(frame) => {
                let e = PipeLinkError::PayloadTooLarge {
                    len: frame.len(),
                    max: MAX_FRAME_SIZE,
                };
                warn!(?cmd, error = %e, "request dropped");
                self.shared.events.push(Event::error(ErrorCode::InvalidPayload, e.to_string()));
                return Ok(());
            }
            Err(e) => {
                warn!(?cmd, error = %e, "request dropped");
                self.shared.events.push(Event::error(ErrorCode::InvalidPayload, e.to_string()));
                return Ok(());
            }
        };

        self.shared.pending.insert(nonce.clone(), cmd);
        trace!(nonce = %nonce, ?cmd, "frame out");
        if let Err(e) = self.transport.write_frame(&frame).await {
            self.shared.pending.resolve(&nonce);
            if self.state != ConnectionState::Disconnecting {
                self.shared.commands.requeue(req);
            }
            return Err(e);
        }

        match req {
            Request::SetPresence(activity) => self.desired_presence = Some(activity),
            Request::ClearPresence => self.desired_presence = None,
            _ => {}
        }
        Ok(())
    }

    async fn route(&mut self, frame: Frame) -> Result<()> {
        match self.dispatcher.dispatch(frame, self.state) {
            Routed::Handled => {}
            Routed::Reply(reply) => self.transport.write_frame(&reply).await?,
            Routed::Ready(info) => {
                self.handshake_deadline = None;
                self.backoff.reset();
                self.shared.set_failures(0);
                self.shared.set_ready(info);
                self.set_state(ConnectionState::Connected);
                info!("handshake complete");
                self.replay_session();
            }
            Routed::Subscription { kind, active } => {
                if active {
                    self.subscriptions.insert(kind);
                } else {
                    self.subscriptions.remove(&kind);
                }
            }
            Routed::Disconnect { code, reason } => self.teardown(code, reason).await,
        }
        Ok(())
    }

    /// Presence and subscriptions die with the pipe on the peer side.
    fn replay_session(&self) {
        let mut replay: Vec<Request> = self
            .desired_presence
            .iter()
            .cloned()
            .map(Request::SetPresence)
            .collect();
        replay.extend(self.subscriptions.iter().copied().map(Request::Subscribe));
        if !replay.is_empty() {
            debug!(count = replay.len(), "replaying session state");
            self.shared.commands.restore(replay);
        }
    }

    /// Queue the Close event, abandon in-flight requests and drop the pipe,
    /// then back off before the next connect.
    async fn teardown(&mut self, code: i64, reason: String) {
        let was = self.state;
        warn!(code, reason = %reason, state = was.as_str(), "connection lost");

        self.shared.events.push(Event::Close { code, reason });
        self.shared.pending.abandon_all();
        self.transport.close().await;
        self.handshake_deadline = None;
        self.set_state(ConnectionState::Disconnected);

        if !self.shutdown_requested() {
            self.after_failed_attempt().await;
        }
    }

    async fn shutdown_sequence(&mut self) {
        let dropped = self.shared.commands.clear();
        info!(dropped, state = self.state.as_str(), "shutting down");

        if self.state.is_ready() {
            self.set_state(ConnectionState::Disconnecting);
            if self.cfg.connection.clear_on_shutdown {
                if let Err(e) = self.send_request(Request::ClearPresence).await {
                    debug!(error = %e, "clear presence on shutdown failed");
                }
            }
            let handwave = Frame::json(Opcode::Close, &Handshake::new(self.cfg.client_id.clone()));
            let sent = match handwave {
                Ok(frame) => self.transport.write_frame(&frame).await,
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                debug!(error = %e, "handwave failed");
            }
        } else if self.state.has_transport() {
            self.set_state(ConnectionState::Disconnecting);
        }

        self.transport.close().await;
        self.shared.pending.abandon_all();
        self.set_state(ConnectionState::Disconnected);
    }
}

/// Read one frame; with `drain` set, only take what is already buffered.
async fn read_next<T: PipeTransport>(transport: &mut T, drain: bool) -> Result<ReadOutcome> {
    if !drain {
        return transport.read_frame().await;
    }
    match tokio::time::timeout(Duration::ZERO, transport.read_frame()).await {
        Ok(read) => read,
        Err(_) => Ok(ReadOutcome::WouldBlock),
    }
}
