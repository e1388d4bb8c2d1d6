//! JSON payload envelope and the closed command/event vocabularies.
//!
//! The inbound envelope stores `data`/`args` as `RawValue` so the dispatch
//! layer only parses the body once it knows which typed message it wants.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{PipeLinkError, Result};

/// Version sent in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Payload command tag (`cmd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Dispatch,
    SetActivity,
    Subscribe,
    Unsubscribe,
    SendActivityJoinInvite,
    CloseActivityJoinRequest,
    GetVoiceSettings,
    /// OAuth flow; in the vocabulary, never sent.
    Authorize,
    /// OAuth flow; in the vocabulary, never sent.
    Authenticate,
    /// Any inbound tag outside this vocabulary.
    #[serde(other)]
    Unknown,
}

/// Server event tag (`evt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    Ready,
    Error,
    ActivityJoin,
    ActivitySpectate,
    ActivityJoinRequest,
    /// Legacy voice/channel/guild events. Rejected by dispatch.
    #[serde(other)]
    Unsupported,
}

/// First frame of every connection (also reused as the shutdown handwave).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub v: u32,
    pub client_id: String,
}

impl Handshake {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            client_id: client_id.into(),
        }
    }
}

/// Structured reason carried by a peer `Close` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePayload {
    #[serde(default)]
    pub code: i64,
    #[serde(default, rename = "message")]
    pub reason: String,
}

/// Inbound envelope (payload of a `Frame` opcode).
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub cmd: Command,
    /// Echo of the request nonce; null for unsolicited pushes.
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub evt: Option<ServerEvent>,
    /// Optional body, stored as raw JSON (lazy parsing).
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
    #[serde(default)]
    pub args: Option<Box<RawValue>>,
}

impl Envelope {
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw)
            .map_err(|e| PipeLinkError::BadPayload(format!("invalid envelope json: {e}")))
    }

    /// Parse `data` into `T`. `Ok(None)` when absent or null.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let Some(raw) = self.data.as_deref() else {
            return Ok(None);
        };
        if raw.get() == "null" {
            return Ok(None);
        }
        serde_json::from_str(raw.get())
            .map(Some)
            .map_err(|e| PipeLinkError::BadPayload(format!("invalid {:?} data: {e}", self.cmd)))
    }

    pub fn is_event(&self, evt: ServerEvent) -> bool {
        self.evt == Some(evt)
    }
}

/// Outbound envelope built by the command layer.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundPayload {
    pub cmd: Command,
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evt: Option<ServerEvent>,
}
