//! Pipe frame codec (panic-free).
//!
//! Wire layout: `opcode:u32-LE | length:u32-LE | payload[length]`.
//!
//! Parsing rules:
//! - Never index (`buf[0]`); always use `Buf` and `remaining()` checks.
//! - A declared length above `MAX_FRAME_SIZE` is rejected from the header
//!   alone; the payload is never read. Framing cannot be trusted afterwards,
//!   so callers must drop the connection.

use std::io::Read;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{trace, warn};

use crate::error::{PipeLinkError, Result};

/// Header size in bytes.
pub const HEADER_SIZE: usize = 8;

/// Protocol ceiling for a single payload (16 KiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024;

/// Wire-level frame tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Handshake,
    Frame,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    pub fn from_u32(v: u32) -> Result<Self> {
        match v {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Frame),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            other => Err(PipeLinkError::UnknownOpcode(other)),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Opcode::Handshake => 0,
            Opcode::Frame => 1,
            Opcode::Close => 2,
            Opcode::Ping => 3,
            Opcode::Pong => 4,
        }
    }
}

/// One header-prefixed unit exchanged over the pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: Opcode,
    /// UTF-8 JSON for everything except some `Close` payloads (zero-copy).
    pub payload: Bytes,
}

impl Frame {
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Serialize `value` as the JSON payload.
    pub fn json<T: Serialize>(opcode: Opcode, value: &T) -> Result<Self> {
        let raw = serde_json::to_vec(value)
            .map_err(|e| PipeLinkError::BadPayload(format!("json encode failed: {e}")))?;
        Ok(Self::new(opcode, raw))
    }

    /// Deserialize the JSON payload.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| PipeLinkError::BadPayload(format!("json decode failed: {e}")))
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload as text (lossy), for logs and raw close reasons.
    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[derive(Debug, Clone, Copy)]
struct Header {
    opcode: Opcode,
    len: usize,
}

fn parse_header(mut head: &[u8]) -> Result<Header> {
    if head.remaining() < HEADER_SIZE {
        return Err(PipeLinkError::CorruptFrame("header too short".into()));
    }

    let op = head.get_u32_le();
    let len = head.get_u32_le() as usize;

    // Length first: an oversize frame is corrupt whatever its opcode says.
    if len > MAX_FRAME_SIZE {
        warn!(op, len, max = MAX_FRAME_SIZE, "frame header rejected: oversize");
        return Err(PipeLinkError::CorruptFrame(format!(
            "declared length {len} exceeds {MAX_FRAME_SIZE}"
        )));
    }

    let opcode = Opcode::from_u32(op).map_err(|e| {
        warn!(op, len, "frame header rejected: unknown opcode");
        e
    })?;
    trace!(?opcode, len, "frame header");
    Ok(Header { opcode, len })
}

/// Encode a frame into header + payload bytes.
pub fn encode_frame(frame: &Frame) -> Result<Bytes> {
    let len = frame.payload.len();
    if len > MAX_FRAME_SIZE {
        return Err(PipeLinkError::PayloadTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut out = BytesMut::with_capacity(HEADER_SIZE + len);
    out.put_u32_le(frame.opcode.as_u32());
    out.put_u32_le(len as u32);
    out.put_slice(&frame.payload);
    Ok(out.freeze())
}

/// Read exactly one frame from a blocking reader.
///
/// Reads exactly `HEADER_SIZE` bytes, then exactly `length` bytes. EOF at any
/// point surfaces as `ConnectionClosed`.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame> {
    let mut head = [0u8; HEADER_SIZE];
    reader.read_exact(&mut head)?;
    let header = parse_header(&head)?;

    let mut payload = vec![0u8; header.len];
    reader.read_exact(&mut payload)?;

    Ok(Frame::new(header.opcode, payload))
}

/// Decode one frame from an accumulation buffer, if a whole one is present.
///
/// Returns `Ok(None)` and leaves `buf` untouched while the frame is still
/// incomplete. The header is validated as soon as it is buffered, so an
/// oversize length fails without waiting for its payload.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Frame>> {
    let Some(head) = buf.get(..HEADER_SIZE) else {
        return Ok(None);
    };
    let header = parse_header(head)?;

    if buf.remaining() < HEADER_SIZE + header.len {
        buf.reserve(HEADER_SIZE + header.len - buf.remaining());
        return Ok(None);
    }

    buf.advance(HEADER_SIZE);
    let payload = buf.split_to(header.len).freeze();
    Ok(Some(Frame::new(header.opcode, payload)))
}
