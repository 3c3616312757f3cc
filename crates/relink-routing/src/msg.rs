//! # Routing Message Codec
//!
//! Every message is a sequence of big-endian 32-bit integers with no framing
//! beyond the UDP datagram boundary:
//!
//! ```text
//! INIT        type=1, router_id
//! LSA         type=3, sender_id, sender_link_id,
//!             router_id, router_link_id, router_link_cost
//! CIRCUIT_DB  type=4, n_links, n_links × (link_id, cost)
//! ```
//!
//! The LSA is exactly 24 bytes. `sender_id`/`sender_link_id` address the
//! forwarding hop (which physical link the emulator relays on); the
//! `router_id`/`router_link_id`/`router_link_cost` triple is the advertised
//! fact and is preserved verbatim while flooding.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

use crate::{Cost, LinkId, RouterId};

// ─── Message Types ──────────────────────────────────────────────────────────

pub const MSG_INIT: u32 = 0x1;
pub const MSG_LSA: u32 = 0x3;
pub const MSG_CIRCUIT_DB: u32 = 0x4;

// ─── Decode Errors ──────────────────────────────────────────────────────────

/// Why a datagram failed to parse. `UnknownType` is dropped with a log line;
/// the rest are dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("datagram too short for its message layout")]
    Truncated,
    #[error("unknown message type {0:#x}")]
    UnknownType(u32),
    #[error("advertised field count does not match datagram size")]
    LengthMismatch,
}

// ─── Messages ───────────────────────────────────────────────────────────────

/// Router → emulator registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Init {
    pub router_id: RouterId,
}

/// Emulator → router: the links incident on the requesting router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitDb {
    pub links: Vec<(LinkId, Cost)>,
}

/// A flooded link-state advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lsa {
    pub sender_id: RouterId,
    pub sender_link_id: LinkId,
    pub router_id: RouterId,
    pub router_link_id: LinkId,
    pub router_link_cost: Cost,
}

impl Lsa {
    /// Wire size: six 4-byte fields including the type tag.
    pub const WIRE_LEN: usize = 24;

    /// The flooding deduplication key. Keying on the full advertised triple
    /// also suppresses re-floods after a cost change, which is the intended
    /// behavior for this static-topology protocol.
    pub fn dedup_key(&self) -> (RouterId, LinkId, Cost) {
        (self.router_id, self.router_link_id, self.router_link_cost)
    }

    /// Re-address this advertisement for forwarding by `sender` out
    /// `link_id`. The advertised triple is untouched.
    pub fn forwarded_by(&self, sender: RouterId, link_id: LinkId) -> Lsa {
        Lsa {
            sender_id: sender,
            sender_link_id: link_id,
            ..*self
        }
    }
}

/// Any decodable routing-plane message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Init(Init),
    CircuitDb(CircuitDb),
    Lsa(Lsa),
}

impl Message {
    pub fn encode(&self) -> BytesMut {
        match self {
            Message::Init(init) => {
                let mut buf = BytesMut::with_capacity(8);
                buf.put_u32(MSG_INIT);
                buf.put_u32(init.router_id);
                buf
            }
            Message::CircuitDb(db) => {
                let mut buf = BytesMut::with_capacity(8 + db.links.len() * 8);
                buf.put_u32(MSG_CIRCUIT_DB);
                buf.put_u32(db.links.len() as u32);
                for &(link_id, cost) in &db.links {
                    buf.put_u32(link_id);
                    buf.put_u32(cost);
                }
                buf
            }
            Message::Lsa(lsa) => {
                let mut buf = BytesMut::with_capacity(Lsa::WIRE_LEN);
                buf.put_u32(MSG_LSA);
                buf.put_u32(lsa.sender_id);
                buf.put_u32(lsa.sender_link_id);
                buf.put_u32(lsa.router_id);
                buf.put_u32(lsa.router_link_id);
                buf.put_u32(lsa.router_link_cost);
                buf
            }
        }
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Message, DecodeError> {
        if buf.remaining() < 4 {
            return Err(DecodeError::Truncated);
        }
        match buf.get_u32() {
            MSG_INIT => {
                if buf.remaining() < 4 {
                    return Err(DecodeError::Truncated);
                }
                Ok(Message::Init(Init {
                    router_id: buf.get_u32(),
                }))
            }
            MSG_CIRCUIT_DB => {
                if buf.remaining() < 4 {
                    return Err(DecodeError::Truncated);
                }
                let n_links = buf.get_u32() as usize;
                if buf.remaining() != n_links * 8 {
                    return Err(DecodeError::LengthMismatch);
                }
                let mut links = Vec::with_capacity(n_links);
                for _ in 0..n_links {
                    links.push((buf.get_u32(), buf.get_u32()));
                }
                Ok(Message::CircuitDb(CircuitDb { links }))
            }
            MSG_LSA => {
                if buf.remaining() < Lsa::WIRE_LEN - 4 {
                    return Err(DecodeError::Truncated);
                }
                Ok(Message::Lsa(Lsa {
                    sender_id: buf.get_u32(),
                    sender_link_id: buf.get_u32(),
                    router_id: buf.get_u32(),
                    router_link_id: buf.get_u32(),
                    router_link_cost: buf.get_u32(),
                }))
            }
            other => Err(DecodeError::UnknownType(other)),
        }
    }
}
