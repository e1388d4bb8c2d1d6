use std::time::Duration;

use pipelink_core::error::{PipeLinkError, Result};
use serde::Deserialize;

/// Highest number of endpoint slots the peer ever listens on.
pub const MAX_SLOTS: u8 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub version: u32,

    pub client_id: String,

    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub backoff: BackoffSection,

    #[serde(default)]
    pub queues: QueueSection,
}

impl EngineConfig {
    /// All-defaults config for `client_id`.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            version: 1,
            client_id: client_id.into(),
            connection: ConnectionSection::default(),
            backoff: BackoffSection::default(),
            queues: QueueSection::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PipeLinkError::UnsupportedVersion);
        }
        if self.client_id.trim().is_empty() {
            return Err(PipeLinkError::BadConfig("client_id must not be empty".into()));
        }

        self.connection.validate()?;
        self.backoff.validate()?;
        self.queues.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    #[serde(default = "default_slot_count")]
    pub slot_count: u8,

    /// Slot tried before the full range.
    #[serde(default)]
    pub target_slot: Option<u8>,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_max_connection_attempts")]
    pub max_connection_attempts: u32,

    #[serde(default = "default_clear_on_shutdown")]
    pub clear_on_shutdown: bool,

    /// Reported in presence commands. Defaults to the current process id.
    #[serde(default)]
    pub process_id: Option<u32>,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            target_slot: None,
            handshake_timeout_ms: default_handshake_timeout_ms(),
            idle_wait_ms: default_idle_wait_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            max_connection_attempts: default_max_connection_attempts(),
            clear_on_shutdown: default_clear_on_shutdown(),
            process_id: None,
        }
    }
}

impl ConnectionSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SLOTS).contains(&self.slot_count) {
            return Err(PipeLinkError::BadConfig(format!(
                "connection.slot_count must be between 1 and {MAX_SLOTS}"
            )));
        }
        if let Some(slot) = self.target_slot {
            if slot >= MAX_SLOTS {
                return Err(PipeLinkError::BadConfig(format!(
                    "connection.target_slot must be below {MAX_SLOTS}"
                )));
            }
        }
        if self.handshake_timeout_ms == 0 {
            return Err(PipeLinkError::BadConfig(
                "connection.handshake_timeout_ms must be positive".into(),
            ));
        }
        if self.idle_wait_ms == 0 || self.read_timeout_ms == 0 {
            return Err(PipeLinkError::BadConfig(
                "connection.idle_wait_ms and read_timeout_ms must be positive".into(),
            ));
        }
        if self.max_connection_attempts == 0 {
            return Err(PipeLinkError::BadConfig(
                "connection.max_connection_attempts must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Slots in connection order: the target first, then the full range.
    pub fn slot_order(&self) -> Vec<u8> {
        let mut order = Vec::with_capacity(usize::from(self.slot_count) + 1);
        if let Some(target) = self.target_slot {
            order.push(target);
        }
        order.extend((0..self.slot_count).filter(|s| Some(*s) != self.target_slot));
        order
    }

    pub fn pid(&self) -> u32 {
        self.process_id.unwrap_or_else(std::process::id)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn default_slot_count() -> u8 {
    MAX_SLOTS
}
fn default_handshake_timeout_ms() -> u64 {
    5000
}
fn default_idle_wait_ms() -> u64 {
    50
}
fn default_read_timeout_ms() -> u64 {
    100
}
fn default_max_connection_attempts() -> u32 {
    10
}
fn default_clear_on_shutdown() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffSection {
    #[serde(default = "default_backoff_min_ms")]
    pub min_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffSection {
    fn default() -> Self {
        Self {
            min_ms: default_backoff_min_ms(),
            max_ms: default_backoff_max_ms(),
        }
    }
}

impl BackoffSection {
    pub fn validate(&self) -> Result<()> {
        if self.min_ms == 0 {
            return Err(PipeLinkError::BadConfig("backoff.min_ms must be positive".into()));
        }
        if self.min_ms > self.max_ms {
            return Err(PipeLinkError::BadConfig(
                "backoff.min_ms must not exceed backoff.max_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_backoff_min_ms() -> u64 {
    500
}
fn default_backoff_max_ms() -> u64 {
    60000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSection {
    #[serde(default = "default_max_commands")]
    pub max_commands: usize,

    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            max_commands: default_max_commands(),
            max_events: default_max_events(),
        }
    }
}

impl QueueSection {
    pub fn validate(&self) -> Result<()> {
        if self.max_commands == 0 || self.max_events == 0 {
            return Err(PipeLinkError::BadConfig(
                "queues.max_commands and queues.max_events must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_commands() -> usize {
    512
}
fn default_max_events() -> usize {
    128
}
