//! # Go-Back-N Exchange Harness
//!
//! Runs a complete in-process transfer: sender state machine → wire encode →
//! impaired channel → wire decode → receiver state machine, with the single
//! retransmission timer driven deterministically — it "fires" whenever a
//! round moves no datagram while data is still outstanding, exactly the
//! situation in which the real 100 ms deadline would expire first.

use std::collections::VecDeque;

use bytes::Bytes;
use relink_transport::receiver::{GbnReceiver, ReceiverEvent};
use relink_transport::sender::{GbnSender, SendOutcome, SenderConfig, SenderEvent};
use relink_transport::wire::{Packet, PacketKind, MAX_DATA_LEN};

use crate::loss::Impairment;

/// Everything observable about a finished transfer.
pub struct TransferReport {
    /// Bytes the receiver appended to its output file.
    pub received: Vec<u8>,
    /// Every DATA sequence number put on the wire, retransmissions included
    /// (the `seqnum` log).
    pub seqnum_log: Vec<i32>,
    /// Every ACK sequence number delivered to the sender (the `ack` log).
    pub ack_log: Vec<i32>,
    /// Every DATA sequence number the receiver saw (the `arrival` log).
    pub arrival_log: Vec<i32>,
    /// Largest window occupancy observed.
    pub max_in_flight: u32,
    /// Timer fires.
    pub timeouts: u64,
    pub sender_stats: relink_transport::stats::SenderStats,
    pub receiver_stats: relink_transport::stats::ReceiverStats,
}

/// Drive `source` through the channel until the EOT handshake completes.
///
/// Panics if the exchange deadlocks or fails to finish within a generous
/// round budget — both only happen on a protocol bug.
pub fn run_transfer(
    source: &[u8],
    mut to_receiver: impl Impairment,
    mut to_sender: impl Impairment,
) -> TransferReport {
    let mut tx = GbnSender::new(SenderConfig::default());
    let mut rx = GbnReceiver::default();

    let mut chunks: VecDeque<Bytes> = source
        .chunks(MAX_DATA_LEN)
        .map(Bytes::copy_from_slice)
        .collect();
    let mut pending: Option<Bytes> = None;
    let mut input_done = false;

    let mut report = TransferReport {
        received: Vec::new(),
        seqnum_log: Vec::new(),
        ack_log: Vec::new(),
        arrival_log: Vec::new(),
        max_in_flight: 0,
        timeouts: 0,
        sender_stats: Default::default(),
        receiver_stats: Default::default(),
    };

    for _round in 0..100_000 {
        if tx.is_complete() {
            report.sender_stats = tx.stats().clone();
            report.receiver_stats = rx.stats().clone();
            return report;
        }

        // Producer: feed the window until it refuses or the file ends.
        while !input_done {
            let chunk = match pending.take().or_else(|| chunks.pop_front()) {
                Some(c) => c,
                None => {
                    input_done = true;
                    tx.finish_input();
                    break;
                }
            };
            match tx.try_send(chunk.clone()) {
                SendOutcome::Queued => {}
                SendOutcome::WindowFull => {
                    pending = Some(chunk);
                    break;
                }
            }
        }

        let moved = pump(
            &mut tx,
            &mut rx,
            &mut to_receiver,
            &mut to_sender,
            &mut report,
        );
        report.max_in_flight = report.max_in_flight.max(tx.in_flight());

        if !moved && !tx.is_complete() {
            // The channel is quiet with data outstanding: the deadline
            // fires. The retransmissions cross on the next round — and if
            // the channel eats them all, the deadline simply fires again.
            report.timeouts += 1;
            tx.on_timeout();
        }
    }
    panic!("transfer did not complete");
}

/// One channel round: carry sender output to the receiver and replies back.
/// Returns whether any datagram was delivered.
fn pump(
    tx: &mut GbnSender,
    rx: &mut GbnReceiver,
    to_receiver: &mut impl Impairment,
    to_sender: &mut impl Impairment,
    report: &mut TransferReport,
) -> bool {
    let mut moved = false;

    let outbound: Vec<SenderEvent> = tx.drain_events().collect();
    for event in outbound {
        let packet = match event {
            SenderEvent::Transmit { packet, .. } => packet,
            SenderEvent::ArmTimer | SenderEvent::CancelTimer => continue,
        };
        if packet.kind == PacketKind::Data {
            report.seqnum_log.push(packet.seq);
        }
        if to_receiver.should_drop(&packet) {
            continue;
        }
        moved = true;
        let decoded = Packet::decode(&mut packet.encode().freeze()).expect("valid wire frame");
        if decoded.kind == PacketKind::Data {
            report.arrival_log.push(decoded.seq);
        }
        rx.handle_packet(decoded);
    }

    let replies: Vec<ReceiverEvent> = rx.drain_events().collect();
    for event in replies {
        match event {
            ReceiverEvent::Deliver(bytes) => report.received.extend_from_slice(&bytes),
            ReceiverEvent::Finished => {}
            ReceiverEvent::Reply(packet) => {
                if to_sender.should_drop(&packet) {
                    continue;
                }
                moved = true;
                let decoded =
                    Packet::decode(&mut packet.encode().freeze()).expect("valid wire frame");
                match decoded.kind {
                    PacketKind::Ack => {
                        report.ack_log.push(decoded.seq);
                        tx.handle_ack(decoded.seq);
                    }
                    PacketKind::Eot => tx.handle_eot_reply(),
                    PacketKind::Data => unreachable!("receiver never sends data"),
                }
            }
        }
    }

    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::Lossless;

    #[test]
    fn lossless_single_chunk_transfer() {
        let report = run_transfer(b"tiny", Lossless, Lossless);
        assert_eq!(report.received, b"tiny");
        assert_eq!(report.seqnum_log, vec![0]);
        assert_eq!(report.ack_log, vec![0]);
        assert_eq!(report.timeouts, 0);
    }
}
