//! # Sender State Machine
//!
//! Pure logic — no I/O. Accepts file chunks, assigns sequence numbers,
//! buffers outbound DATA in the sliding window, reacts to cumulative ACKs,
//! retransmits the whole window on timeout, and closes the transfer with a
//! single EOT once every chunk is acknowledged.
//!
//! The sender does NOT manage sockets or clocks. It emits [`SenderEvent`]s
//! for the caller to execute:
//!
//! - `Transmit` — put a packet on the wire (fresh or retransmitted)
//! - `ArmTimer` — (re)start the single retransmission deadline, replacing
//!   any prior one
//! - `CancelTimer` — clear the deadline
//!
//! The caller reports a fired deadline back via [`GbnSender::on_timeout`].
//! A fire that raced with a cancelling ACK is ignored.

use bytes::Bytes;

use crate::stats::SenderStats;
use crate::wire::{Packet, MAX_DATA_LEN, SEQ_MODULO, WINDOW_SIZE};
use crate::window::SendWindow;

// ─── Configuration ──────────────────────────────────────────────────────────

/// Sender parameters. The defaults are the protocol constants; tests shrink
/// them to force wrap-around quickly.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Maximum simultaneously outstanding DATA packets.
    pub window_size: u32,
    /// Sequence number modulo.
    pub seq_modulo: u32,
    /// Chunk size ceiling for DATA payloads.
    pub max_data_len: usize,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            window_size: WINDOW_SIZE,
            seq_modulo: SEQ_MODULO,
            max_data_len: MAX_DATA_LEN,
        }
    }
}

// ─── Events ─────────────────────────────────────────────────────────────────

/// Actions for the caller to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderEvent {
    /// Send `packet` on the wire. Every DATA transmission, retransmitted or
    /// not, is also recorded in the sequence-number log by the caller.
    Transmit { packet: Packet, retransmit: bool },
    /// (Re)arm the retransmission timer. At most one deadline is ever armed.
    ArmTimer,
    /// Cancel the armed timer.
    CancelTimer,
}

/// Result of offering a chunk to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Chunk buffered and emitted.
    Queued,
    /// Window full — offer the same chunk again after an ACK frees a slot.
    WindowFull,
}

// ─── Sender ─────────────────────────────────────────────────────────────────

/// Go-Back-N sender.
pub struct GbnSender {
    config: SenderConfig,
    window: SendWindow,
    input_finished: bool,
    eot_sent: bool,
    complete: bool,
    events: Vec<SenderEvent>,
    stats: SenderStats,
}

impl GbnSender {
    pub fn new(config: SenderConfig) -> Self {
        let window = SendWindow::new(config.seq_modulo, config.window_size);
        GbnSender {
            config,
            window,
            input_finished: false,
            eot_sent: false,
            complete: false,
            events: Vec::new(),
            stats: SenderStats::default(),
        }
    }

    /// Offer the next file chunk. Never recurses and never blocks: a full
    /// window yields [`SendOutcome::WindowFull`] and the caller retries once
    /// an ACK opens a slot.
    pub fn try_send(&mut self, payload: Bytes) -> SendOutcome {
        debug_assert!(!self.input_finished);
        debug_assert!(!payload.is_empty() && payload.len() <= self.config.max_data_len);
        if self.window.is_full() {
            return SendOutcome::WindowFull;
        }

        let was_empty = self.window.is_empty();
        let packet = Packet::data(self.window.next_seq() as i32, payload);
        self.events.push(SenderEvent::Transmit {
            packet: packet.clone(),
            retransmit: false,
        });
        self.window.push(packet);
        if was_empty {
            self.events.push(SenderEvent::ArmTimer);
        }
        self.stats.packets_sent += 1;
        SendOutcome::Queued
    }

    /// The producer has offered every chunk. If the window is already empty
    /// (everything acknowledged, or the file had no chunks at all) the EOT
    /// goes out immediately; otherwise it follows the draining ACK.
    pub fn finish_input(&mut self) {
        self.input_finished = true;
        self.maybe_send_eot();
    }

    /// Cumulative ACK handling: an in-window ACK advances `base` past it and
    /// restarts (or, on drain, stops) the timer. Anything that would move
    /// `base` backward on the ring — duplicates, stale ACKs, the `-1`
    /// sentinel — is ignored without touching the timer.
    pub fn handle_ack(&mut self, seq: i32) {
        if !self.window.contains(seq) {
            tracing::trace!(seq, base = self.window.base(), "ignoring out-of-window ack");
            self.stats.acks_ignored += 1;
            return;
        }
        self.stats.acks_received += 1;
        self.window.advance_to(seq as u32);

        if self.window.is_empty() {
            self.events.push(SenderEvent::CancelTimer);
            self.maybe_send_eot();
        } else {
            self.events.push(SenderEvent::ArmTimer);
        }
    }

    /// The retransmission deadline fired: rearm, then resend every buffered
    /// packet in `[base, next_seq)` in order.
    pub fn on_timeout(&mut self) {
        if self.window.unacked().next().is_none() {
            // Raced with the ACK that drained the window.
            return;
        }
        self.stats.timeouts += 1;
        self.events.push(SenderEvent::ArmTimer);
        let outstanding: Vec<Packet> = self.window.unacked().cloned().collect();
        for packet in outstanding {
            self.stats.retransmissions += 1;
            self.events.push(SenderEvent::Transmit {
                packet,
                retransmit: true,
            });
        }
    }

    /// The receiver answered our EOT; the transfer is over.
    pub fn handle_eot_reply(&mut self) {
        self.complete = true;
    }

    fn maybe_send_eot(&mut self) {
        if self.input_finished && !self.eot_sent && self.window.is_empty() {
            self.eot_sent = true;
            let packet = Packet::eot(self.window.next_seq() as i32);
            // The EOT consumes a sequence number but is never buffered for
            // retransmission.
            self.window.bump_next_seq();
            self.events.push(SenderEvent::Transmit {
                packet,
                retransmit: false,
            });
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn drain_events(&mut self) -> impl Iterator<Item = SenderEvent> + '_ {
        self.events.drain(..)
    }

    /// Whether the EOT handshake has completed.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether `try_send` would accept a chunk right now.
    pub fn window_has_room(&self) -> bool {
        !self.window.is_full()
    }

    /// Outstanding DATA packets (never exceeds the window size).
    pub fn in_flight(&self) -> u32 {
        self.window.unacked().count() as u32
    }

    pub fn base(&self) -> u32 {
        self.window.base()
    }

    pub fn next_seq(&self) -> u32 {
        self.window.next_seq()
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }
}
