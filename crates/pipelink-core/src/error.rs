//! Shared error type across pipelink crates.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Numeric error codes (stable API).
///
/// The low codes are raised locally by the pipe layer; the 1000+ range is
/// reported by the peer inside `ERROR` envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,
    /// Transport failure (connect, read, or write).
    PipeException,
    /// Frame or payload could not be decoded.
    ReadCorrupt,
    /// Part of the protocol vocabulary this engine refuses to speak.
    NotImplemented,
    UnknownError,
    InvalidPayload,
    InvalidCommand,
    InvalidGuild,
    InvalidEvent,
    InvalidChannel,
    InvalidPermissions,
    InvalidClientId,
    InvalidOrigin,
    InvalidToken,
    InvalidUser,
    OAuth2Error,
    /// Any code this engine does not know by name.
    Other(i64),
}

impl ErrorCode {
    pub fn from_i64(v: i64) -> Self {
        match v {
            0 => ErrorCode::Success,
            1 => ErrorCode::PipeException,
            2 => ErrorCode::ReadCorrupt,
            10 => ErrorCode::NotImplemented,
            1000 => ErrorCode::UnknownError,
            4000 => ErrorCode::InvalidPayload,
            4002 => ErrorCode::InvalidCommand,
            4003 => ErrorCode::InvalidGuild,
            4004 => ErrorCode::InvalidEvent,
            4005 => ErrorCode::InvalidChannel,
            4006 => ErrorCode::InvalidPermissions,
            4007 => ErrorCode::InvalidClientId,
            4008 => ErrorCode::InvalidOrigin,
            4009 => ErrorCode::InvalidToken,
            4010 => ErrorCode::InvalidUser,
            5000 => ErrorCode::OAuth2Error,
            other => ErrorCode::Other(other),
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::PipeException => 1,
            ErrorCode::ReadCorrupt => 2,
            ErrorCode::NotImplemented => 10,
            ErrorCode::UnknownError => 1000,
            ErrorCode::InvalidPayload => 4000,
            ErrorCode::InvalidCommand => 4002,
            ErrorCode::InvalidGuild => 4003,
            ErrorCode::InvalidEvent => 4004,
            ErrorCode::InvalidChannel => 4005,
            ErrorCode::InvalidPermissions => 4006,
            ErrorCode::InvalidClientId => 4007,
            ErrorCode::InvalidOrigin => 4008,
            ErrorCode::InvalidToken => 4009,
            ErrorCode::InvalidUser => 4010,
            ErrorCode::OAuth2Error => 5000,
            ErrorCode::Other(v) => v,
        }
    }

    /// String representation used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Success => "SUCCESS",
            ErrorCode::PipeException => "PIPE_EXCEPTION",
            ErrorCode::ReadCorrupt => "READ_CORRUPT",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
            ErrorCode::InvalidCommand => "INVALID_COMMAND",
            ErrorCode::InvalidGuild => "INVALID_GUILD",
            ErrorCode::InvalidEvent => "INVALID_EVENT",
            ErrorCode::InvalidChannel => "INVALID_CHANNEL",
            ErrorCode::InvalidPermissions => "INVALID_PERMISSIONS",
            ErrorCode::InvalidClientId => "INVALID_CLIENT_ID",
            ErrorCode::InvalidOrigin => "INVALID_ORIGIN",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::InvalidUser => "INVALID_USER",
            ErrorCode::OAuth2Error => "OAUTH2_ERROR",
            ErrorCode::Other(_) => "OTHER",
        }
    }

    /// Codes after which the connection is useless and gets torn down.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidClientId | ErrorCode::InvalidOrigin | ErrorCode::InvalidToken
        )
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        i64::deserialize(deserializer).map(ErrorCode::from_i64)
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PipeLinkError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum PipeLinkError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),
    #[error("payload too large: {len} > {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("unknown opcode: {0}")]
    UnknownOpcode(u32),
    #[error("bad payload: {0}")]
    BadPayload(String),
    #[error("io: {0}")]
    Io(String),
    #[error("not connected")]
    NotConnected,
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("engine shut down")]
    ShutDown,
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl PipeLinkError {
    /// Map internal error to a stable numeric code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PipeLinkError::ConnectionClosed
            | PipeLinkError::Io(_)
            | PipeLinkError::NotConnected
            | PipeLinkError::Timeout(_) => ErrorCode::PipeException,
            PipeLinkError::CorruptFrame(_)
            | PipeLinkError::PayloadTooLarge { .. }
            | PipeLinkError::UnknownOpcode(_) => ErrorCode::ReadCorrupt,
            PipeLinkError::BadPayload(_) => ErrorCode::InvalidPayload,
            PipeLinkError::ShutDown
            | PipeLinkError::BadConfig(_)
            | PipeLinkError::UnsupportedVersion
            | PipeLinkError::Internal(_) => ErrorCode::UnknownError,
        }
    }
}

impl From<std::io::Error> for PipeLinkError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => PipeLinkError::ConnectionClosed,
            _ => PipeLinkError::Io(e.to_string()),
        }
    }
}
