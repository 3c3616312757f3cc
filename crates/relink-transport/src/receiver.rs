//! # Receiver State Machine
//!
//! Pure logic — no I/O. Accepts decoded packets, delivers the in-order byte
//! stream, answers every DATA with an ACK, and mirrors the EOT to close the
//! transfer.
//!
//! The GBN receiver holds no reorder buffer: a packet is either the one
//! expected next (delivered, acknowledged) or it is answered with the most
//! recent ACK and discarded. Before anything has been delivered in order,
//! that answer is the distinguished `ACK(-1)`.

use crate::stats::ReceiverStats;
use crate::wire::{Packet, PacketKind, SEQ_MODULO};

// ─── Events ─────────────────────────────────────────────────────────────────

/// Actions for the caller to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// Append these bytes to the output file.
    Deliver(bytes::Bytes),
    /// Send this ACK or EOT back through the emulator.
    Reply(Packet),
    /// The EOT handshake is done; tear down.
    Finished,
}

// ─── Receiver ───────────────────────────────────────────────────────────────

/// Go-Back-N receiver.
pub struct GbnReceiver {
    seq_modulo: u32,
    expected_seq: u32,
    last_ack: Option<Packet>,
    finished: bool,
    events: Vec<ReceiverEvent>,
    stats: ReceiverStats,
}

impl GbnReceiver {
    pub fn new(seq_modulo: u32) -> Self {
        GbnReceiver {
            seq_modulo,
            expected_seq: 0,
            last_ack: None,
            finished: false,
            events: Vec::new(),
            stats: ReceiverStats::default(),
        }
    }

    /// Process one decoded packet.
    pub fn handle_packet(&mut self, packet: Packet) {
        match packet.kind {
            PacketKind::Data => self.handle_data(packet),
            PacketKind::Eot => {
                self.stats.eots += 1;
                self.events
                    .push(ReceiverEvent::Reply(Packet::eot(self.expected_seq as i32)));
                self.events.push(ReceiverEvent::Finished);
                self.finished = true;
            }
            // An ACK has no meaning on this side of the transfer.
            PacketKind::Ack => {}
        }
    }

    fn handle_data(&mut self, packet: Packet) {
        self.stats.packets_received += 1;

        if packet.seq == self.expected_seq as i32 {
            // Delivery is conditional on the sequence match — never write
            // out-of-order data.
            self.events.push(ReceiverEvent::Deliver(packet.payload));
            let ack = Packet::ack(self.expected_seq as i32);
            self.events.push(ReceiverEvent::Reply(ack.clone()));
            self.last_ack = Some(ack);
            self.expected_seq = (self.expected_seq + 1) % self.seq_modulo;
            self.stats.delivered += 1;
        } else {
            tracing::trace!(
                seq = packet.seq,
                expected = self.expected_seq,
                "out-of-order data, repeating last ack"
            );
            self.stats.duplicates += 1;
            let reply = self.last_ack.clone().unwrap_or_else(|| Packet::ack(-1));
            self.events.push(ReceiverEvent::Reply(reply));
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn drain_events(&mut self) -> impl Iterator<Item = ReceiverEvent> + '_ {
        self.events.drain(..)
    }

    /// The next in-order sequence number to deliver.
    pub fn expected_seq(&self) -> u32 {
        self.expected_seq
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }
}

impl Default for GbnReceiver {
    fn default() -> Self {
        Self::new(SEQ_MODULO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn data(seq: i32, payload: &'static [u8]) -> Packet {
        Packet::data(seq, Bytes::from_static(payload))
    }

    fn replies(events: &[ReceiverEvent]) -> Vec<i32> {
        events
            .iter()
            .filter_map(|e| match e {
                ReceiverEvent::Reply(p) => Some(p.seq),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn in_order_data_is_delivered_and_acked() {
        let mut rx = GbnReceiver::default();
        rx.handle_packet(data(0, b"abc"));
        let events: Vec<_> = rx.drain_events().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ReceiverEvent::Deliver(Bytes::from_static(b"abc")));
        assert_eq!(replies(&events), vec![0]);
        assert_eq!(rx.expected_seq(), 1);
    }

    #[test]
    fn ack_matches_pre_increment_expected_seq() {
        let mut rx = GbnReceiver::default();
        for seq in 0..3 {
            rx.handle_packet(data(seq, b"x"));
        }
        let events: Vec<_> = rx.drain_events().collect();
        assert_eq!(replies(&events), vec![0, 1, 2]);
    }

    #[test]
    fn out_of_order_data_repeats_last_ack_without_delivery() {
        let mut rx = GbnReceiver::default();
        rx.handle_packet(data(0, b"a"));
        rx.drain_events().for_each(drop);

        rx.handle_packet(data(2, b"c"));
        let events: Vec<_> = rx.drain_events().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(replies(&events), vec![0]);
        assert_eq!(rx.expected_seq(), 1);
        assert_eq!(rx.stats().duplicates, 1);
    }

    #[test]
    fn nothing_in_order_yet_answers_minus_one() {
        let mut rx = GbnReceiver::default();
        rx.handle_packet(data(3, b"late"));
        let events: Vec<_> = rx.drain_events().collect();
        assert_eq!(replies(&events), vec![-1]);
        assert!(!events
            .iter()
            .any(|e| matches!(e, ReceiverEvent::Deliver(_))));
    }

    #[test]
    fn duplicate_data_not_delivered_twice() {
        let mut rx = GbnReceiver::default();
        rx.handle_packet(data(0, b"a"));
        rx.drain_events().for_each(drop);

        rx.handle_packet(data(0, b"a"));
        let events: Vec<_> = rx.drain_events().collect();
        assert!(!events.iter().any(|e| matches!(e, ReceiverEvent::Deliver(_))));
        assert_eq!(replies(&events), vec![0]);
    }

    #[test]
    fn eot_is_mirrored_with_expected_seq() {
        let mut rx = GbnReceiver::default();
        rx.handle_packet(data(0, b"a"));
        rx.drain_events().for_each(drop);

        rx.handle_packet(Packet::eot(1));
        let events: Vec<_> = rx.drain_events().collect();
        match &events[0] {
            ReceiverEvent::Reply(p) => {
                assert_eq!(p.kind, PacketKind::Eot);
                assert_eq!(p.seq, 1);
            }
            other => panic!("expected EOT reply, got {other:?}"),
        }
        assert_eq!(events[1], ReceiverEvent::Finished);
        assert!(rx.is_finished());
    }

    #[test]
    fn stray_ack_is_ignored() {
        let mut rx = GbnReceiver::default();
        rx.handle_packet(Packet::ack(5));
        assert!(rx.drain_events().next().is_none());
    }

    #[test]
    fn expected_seq_wraps() {
        let mut rx = GbnReceiver::default();
        for i in 0..33 {
            rx.handle_packet(data(i % 32, b"x"));
        }
        rx.drain_events().for_each(drop);
        assert_eq!(rx.expected_seq(), 1);
        assert_eq!(rx.stats().delivered, 33);
    }
}
