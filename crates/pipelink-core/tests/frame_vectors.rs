//! Frame codec vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::io::{Cursor, Read};

use bytes::BytesMut;

use pipelink_core::protocol::frame::{
    decode_frame, encode_frame, read_frame, Frame, Opcode, HEADER_SIZE, MAX_FRAME_SIZE,
};
use pipelink_core::PipeLinkError;

use vector_loader::load;

const FILES: [&str; 9] = [
    "frame_handshake.json",
    "frame_ready.json",
    "frame_close.json",
    "frame_ping.json",
    "frame_pong_empty.json",
    "frame_oversize.json",
    "frame_unknown_opcode.json",
    "frame_truncated_header.json",
    "frame_truncated_payload.json",
];

#[test]
fn frame_vectors_blocking_reader() {
    for f in FILES {
        let v = load(f);
        let raw = v.frame.decode();
        let res = read_frame(&mut Cursor::new(raw));

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.error_code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let frame = res.expect("expected ok frame");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(frame.opcode.as_u32() as u64, ex["opcode"].as_u64().unwrap(), "vector={}", v.description);
        assert_eq!(frame.len() as u64, ex["payload_len"].as_u64().unwrap(), "vector={}", v.description);
        assert_eq!(frame.message(), ex["payload"].as_str().unwrap(), "vector={}", v.description);
    }
}

#[test]
fn frame_vectors_reencode_bit_exact() {
    for f in FILES {
        let v = load(f);
        if v.expect_error.is_some() {
            continue;
        }
        let raw = v.frame.decode();
        let frame = read_frame(&mut Cursor::new(raw.clone())).unwrap();
        let encoded = encode_frame(&frame).unwrap();
        assert_eq!(&encoded[..], &raw[..], "vector={}", v.description);
    }
}

#[test]
fn incremental_decode_waits_for_whole_frame() {
    let raw = load("frame_ready.json").frame.decode();
    let mut buf = BytesMut::new();

    // Feed one byte at a time; nothing pops out until the last byte lands.
    for (i, b) in raw.iter().enumerate() {
        buf.extend_from_slice(&[*b]);
        let out = decode_frame(&mut buf).unwrap();
        if i + 1 < raw.len() {
            assert!(out.is_none(), "frame surfaced early at byte {i}");
        } else {
            let frame = out.expect("frame complete");
            assert_eq!(frame.opcode, Opcode::Frame);
            assert_eq!(frame.len(), raw.len() - HEADER_SIZE);
        }
    }
    assert!(buf.is_empty());
}

#[test]
fn incremental_decode_splits_back_to_back_frames() {
    let a = encode_frame(&Frame::new(Opcode::Ping, "a")).unwrap();
    let b = encode_frame(&Frame::new(Opcode::Pong, "bb")).unwrap();
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&a);
    buf.extend_from_slice(&b);

    let first = decode_frame(&mut buf).unwrap().unwrap();
    let second = decode_frame(&mut buf).unwrap().unwrap();
    assert_eq!(first, Frame::new(Opcode::Ping, "a"));
    assert_eq!(second, Frame::new(Opcode::Pong, "bb"));
    assert!(decode_frame(&mut buf).unwrap().is_none());
}

#[test]
fn incremental_decode_rejects_oversize_from_header_alone() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&((MAX_FRAME_SIZE as u32) + 1).to_le_bytes());

    let err = decode_frame(&mut buf).expect_err("oversize must fail");
    assert!(matches!(err, PipeLinkError::CorruptFrame(_)));
}

#[test]
fn incremental_decode_rejects_unknown_opcode_before_payload() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&9u32.to_le_bytes());
    buf.extend_from_slice(&64u32.to_le_bytes());

    let err = decode_frame(&mut buf).expect_err("unknown opcode must fail");
    assert!(matches!(err, PipeLinkError::UnknownOpcode(9)));
}

/// Reader that records how many bytes were pulled from it.
struct CountingReader {
    inner: Cursor<Vec<u8>>,
    consumed: usize,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n;
        Ok(n)
    }
}

#[test]
fn oversize_header_never_reads_payload() {
    for declared in [MAX_FRAME_SIZE as u32 + 1, 1 << 20, u32::MAX] {
        let mut raw = Vec::new();
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.extend_from_slice(&declared.to_le_bytes());
        raw.extend(std::iter::repeat(b'x').take(64));

        let mut reader = CountingReader {
            inner: Cursor::new(raw),
            consumed: 0,
        };
        let err = read_frame(&mut reader).expect_err("oversize must fail");
        assert!(matches!(err, PipeLinkError::CorruptFrame(_)), "declared={declared}");
        assert_eq!(reader.consumed, HEADER_SIZE, "declared={declared}");
    }
}

#[test]
fn round_trip_preserves_opcode_and_payload() {
    let cases = [
        Frame::new(Opcode::Handshake, r#"{"v":1,"client_id":"1"}"#),
        Frame::new(Opcode::Frame, vec![b'{'; 1]),
        Frame::new(Opcode::Close, vec![0xffu8, 0x00, 0x7f]),
        Frame::new(Opcode::Pong, Vec::<u8>::new()),
        Frame::new(Opcode::Frame, vec![b'a'; MAX_FRAME_SIZE]),
    ];

    for frame in cases {
        let encoded = encode_frame(&frame).unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE + frame.len());
        let decoded = read_frame(&mut Cursor::new(encoded.to_vec())).unwrap();
        assert_eq!(decoded, frame);
    }
}

#[test]
fn encode_rejects_payload_over_ceiling() {
    let frame = Frame::new(Opcode::Frame, vec![b'a'; MAX_FRAME_SIZE + 1]);
    let err = encode_frame(&frame).expect_err("must fail");
    assert!(matches!(err, PipeLinkError::PayloadTooLarge { .. }));
}
