//! # GBN Wire Format
//!
//! Fixed-layout datagram codec shared by the sender and receiver.
//!
//! ```text
//!  0               4               8              12
//! +---------------+---------------+---------------+-----------...--+
//! |  kind (u32)   |   seq (i32)   | length (u32)  |    payload     |
//! +---------------+---------------+---------------+-----------...--+
//! ```
//!
//! All integers are big-endian. The sequence field is *signed*: until the
//! first in-order DATA arrives, the receiver answers out-of-order data with
//! the sentinel `ACK(-1)`, and that value is visible on the wire.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::time::Duration;
use thiserror::Error;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Sequence numbers live in `[0, SEQ_MODULO)`.
pub const SEQ_MODULO: u32 = 32;

/// Maximum payload of a single DATA packet.
pub const MAX_DATA_LEN: usize = 500;

/// Fixed header size: kind + seq + length, 4 bytes each.
pub const HEADER_LEN: usize = 12;

/// Default sliding-window capacity.
pub const WINDOW_SIZE: u32 = 10;

/// Timeout of the single cumulative retransmission timer.
pub const RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(100);

// ─── Packet Kind ────────────────────────────────────────────────────────────

/// The three packet kinds on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PacketKind {
    Ack = 0,
    Data = 1,
    Eot = 2,
}

impl PacketKind {
    pub fn from_wire(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(PacketKind::Ack),
            1 => Some(PacketKind::Data),
            2 => Some(PacketKind::Eot),
            _ => None,
        }
    }
}

// ─── Decode Errors ──────────────────────────────────────────────────────────

/// Why a datagram failed to parse. Every variant is dropped by the caller;
/// only [`DecodeError::UnknownKind`] warrants a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("datagram shorter than the {HEADER_LEN}-byte header")]
    Truncated,
    #[error("unknown packet kind {0}")]
    UnknownKind(u32),
    #[error("advertised payload length {advertised} does not match {actual} remaining bytes")]
    LengthMismatch { advertised: usize, actual: usize },
    #[error("advertised payload length {0} exceeds {MAX_DATA_LEN}")]
    Oversized(usize),
}

// ─── Packet ─────────────────────────────────────────────────────────────────

/// A decoded transport packet. ACKs and EOTs carry no payload; DATA carries
/// 1..=[`MAX_DATA_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,
    pub seq: i32,
    pub payload: Bytes,
}

impl Packet {
    /// Create a DATA packet. `payload` must not exceed [`MAX_DATA_LEN`].
    pub fn data(seq: i32, payload: Bytes) -> Self {
        debug_assert!(payload.len() <= MAX_DATA_LEN);
        Packet {
            kind: PacketKind::Data,
            seq,
            payload,
        }
    }

    /// Create an ACK. `seq` may be the `-1` sentinel.
    pub fn ack(seq: i32) -> Self {
        Packet {
            kind: PacketKind::Ack,
            seq,
            payload: Bytes::new(),
        }
    }

    /// Create an EOT.
    pub fn eot(seq: i32) -> Self {
        Packet {
            kind: PacketKind::Eot,
            seq,
            payload: Bytes::new(),
        }
    }

    /// Serialize to wire format.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u32(self.kind as u32);
        buf.put_i32(self.seq);
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        buf
    }

    /// Parse one datagram. The datagram must contain exactly one packet:
    /// trailing or missing payload bytes are a mismatch.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, DecodeError> {
        if buf.remaining() < HEADER_LEN {
            return Err(DecodeError::Truncated);
        }
        let raw_kind = buf.get_u32();
        let kind = PacketKind::from_wire(raw_kind).ok_or(DecodeError::UnknownKind(raw_kind))?;
        let seq = buf.get_i32();
        let advertised = buf.get_u32() as usize;
        if advertised > MAX_DATA_LEN {
            return Err(DecodeError::Oversized(advertised));
        }
        let actual = buf.remaining();
        if advertised != actual {
            return Err(DecodeError::LengthMismatch { advertised, actual });
        }
        let payload = buf.copy_to_bytes(advertised);
        Ok(Packet { kind, seq, payload })
    }

    /// Encoded size of this packet.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}
