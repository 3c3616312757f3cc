//! # relink-transport
//!
//! Go-Back-N reliable transport over an unreliable datagram channel.
//!
//! Fixed 12-byte wire header, 32-entry sequence space, a 10-packet sliding
//! window with cumulative ACKs, and a single retransmission timer. Transfer
//! teardown is a symmetric EOT handshake.
//!
//! ## Crate structure
//!
//! - [`wire`] — packet serialization (DATA / ACK / EOT), protocol constants
//! - [`window`] — circular `[base, next_seq)` send window
//! - [`sender`] — sender state machine
//! - [`receiver`] — receiver state machine
//! - [`stats`] — per-side transfer statistics
//!
//! The state machines are pure logic — no sockets, no clocks. Callers feed
//! packets in, drain events out, and own the single retransmission deadline
//! (`ArmTimer` replaces any prior deadline; `CancelTimer` clears it).

pub mod receiver;
pub mod sender;
pub mod stats;
pub mod window;
pub mod wire;
