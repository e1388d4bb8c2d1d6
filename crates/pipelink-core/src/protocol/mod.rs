//! Protocol modules (binary frame codec + JSON payload envelope).
//!
//! - `frame`: the fixed 8-byte header (`opcode:u32-LE, length:u32-LE`) and
//!   the three decode entry points (blocking reader, incremental buffer,
//!   encode).
//! - `payload`: the JSON envelope riding inside `Frame` opcodes plus the
//!   closed command/event vocabularies.
//!
//! All parsers are panic-free: a malformed header is reported as
//! `PipeLinkError` instead of indexing raw buffers.

pub mod frame;
pub mod payload;

pub use frame::{decode_frame, encode_frame, read_frame, Frame, Opcode, HEADER_SIZE, MAX_FRAME_SIZE};
pub use payload::{
    ClosePayload, Command, Envelope, Handshake, OutboundPayload, ServerEvent, PROTOCOL_VERSION,
};
