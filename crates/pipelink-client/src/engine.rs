//! Application-facing engine handle.
//!
//! `Engine::spawn` starts the single worker task; every other method is a
//! non-blocking operation on the shared bridge. Dropping the engine requests
//! shutdown.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, info_span, Instrument};

use pipelink_core::error::{PipeLinkError, Result};

use crate::bridge::{lock, CommandQueue, Event, EventQueue, PendingTable, ReadyInfo, Request};
use crate::config::EngineConfig;
use crate::connection::worker::Worker;
use crate::connection::ConnectionState;
use crate::transport::PipeTransport;

/// State shared between the engine handle and its worker.
pub(crate) struct Shared {
    pub(crate) commands: CommandQueue,
    pub(crate) events: Arc<EventQueue>,
    pub(crate) pending: Arc<PendingTable>,
    pub(crate) status: watch::Sender<ConnectionState>,
    ready: Mutex<Option<ReadyInfo>>,
    failures: AtomicU32,
    closed: AtomicBool,
}

impl Shared {
    fn new(cfg: &EngineConfig) -> Self {
        let (status, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            commands: CommandQueue::new(cfg.queues.max_commands),
            events: Arc::new(EventQueue::new(cfg.queues.max_events)),
            pending: Arc::new(PendingTable::new()),
            status,
            ready: Mutex::new(None),
            failures: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_ready(&self, info: ReadyInfo) {
        *lock(&self.ready) = Some(info);
    }

    pub(crate) fn set_failures(&self, n: u32) {
        self.failures.store(n, Ordering::Release);
    }
}

pub struct Engine {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    /// Validate `cfg` and spawn the worker on the current tokio runtime.
    pub fn spawn<T>(cfg: EngineConfig, transport: T) -> Result<Self>
    where
        T: PipeTransport + 'static,
    {
        cfg.validate()?;

        let shared = Arc::new(Shared::new(&cfg));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let span = info_span!("pipelink_worker", client_id = %cfg.client_id);
        let worker = Worker::new(cfg, transport, shared.clone(), shutdown_rx);
        let handle = tokio::spawn(worker.run().instrument(span));
        info!("engine spawned");

        Ok(Self {
            shared,
            shutdown,
            worker: Some(handle),
        })
    }

    /// Queue a request for the worker. Fails only after `shutdown`.
    pub fn enqueue_command(&self, req: Request) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(PipeLinkError::ShutDown);
        }
        self.shared.commands.push(req);
        Ok(())
    }

    pub fn try_dequeue_event(&self) -> Option<Event> {
        self.shared.events.try_pop()
    }

    pub fn drain_events(&self) -> Vec<Event> {
        self.shared.events.drain()
    }

    /// Wait for the next event.
    pub async fn next_event(&self) -> Event {
        self.shared.events.recv().await
    }

    pub fn current_status(&self) -> ConnectionState {
        *self.shared.status.borrow()
    }

    pub fn status_watch(&self) -> watch::Receiver<ConnectionState> {
        self.shared.status.subscribe()
    }

    /// Payload of the most recent Ready.
    pub fn ready_info(&self) -> Option<ReadyInfo> {
        lock(&self.shared.ready).clone()
    }

    /// Requests written but not yet answered.
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.len()
    }

    /// Consecutive failed connection attempts since the last Ready.
    pub fn failure_count(&self) -> u32 {
        self.shared.failures.load(Ordering::Acquire)
    }

    pub fn queued_commands(&self) -> usize {
        self.shared.commands.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Ask the worker to stop. Returns immediately; see `join`.
    pub fn shutdown(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            info!("shutdown requested");
        }
        self.shutdown.send_replace(true);
    }

    /// Wait for the worker to finish. Does not itself request shutdown.
    pub async fn join(mut self) -> Result<()> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        handle
            .await
            .map_err(|e| PipeLinkError::Internal(format!("worker task failed: {e}")))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
