//! # Send Window
//!
//! The circular interval `[base, next_seq)` of outstanding sequence numbers,
//! backed by one buffer slot per sequence number. All arithmetic is modulo
//! the sequence space; `base` only ever advances (no backward moves on the
//! ring), and occupancy never exceeds the configured capacity.

use crate::wire::Packet;

/// Sliding window over a bounded sequence space.
#[derive(Debug)]
pub struct SendWindow {
    modulo: u32,
    capacity: u32,
    base: u32,
    next_seq: u32,
    slots: Vec<Option<Packet>>,
}

impl SendWindow {
    /// `capacity` must leave at least one unused sequence number, or a full
    /// window would be indistinguishable from an empty one.
    pub fn new(modulo: u32, capacity: u32) -> Self {
        debug_assert!(capacity > 0 && capacity < modulo);
        SendWindow {
            modulo,
            capacity,
            base: 0,
            next_seq: 0,
            slots: vec![None; modulo as usize],
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Circular cardinality of `[base, next_seq)`.
    pub fn occupancy(&self) -> u32 {
        (self.next_seq + self.modulo - self.base) % self.modulo
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.base == self.next_seq
    }

    /// Circular membership test for `[base, next_seq)`. Negative sequence
    /// numbers (the `-1` sentinel ACK) are never members.
    pub fn contains(&self, seq: i32) -> bool {
        if seq < 0 || seq >= self.modulo as i32 {
            return false;
        }
        let offset = (seq as u32 + self.modulo - self.base) % self.modulo;
        offset < self.occupancy()
    }

    /// Buffer `packet` at `next_seq` and advance. The caller checks
    /// [`SendWindow::is_full`] first.
    pub fn push(&mut self, packet: Packet) {
        debug_assert!(!self.is_full());
        debug_assert_eq!(packet.seq, self.next_seq as i32);
        self.slots[self.next_seq as usize] = Some(packet);
        self.next_seq = (self.next_seq + 1) % self.modulo;
    }

    /// Consume a sequence number without occupying a retransmission slot.
    /// Used for the EOT, which is sent once and never retransmitted.
    pub fn bump_next_seq(&mut self) {
        self.next_seq = (self.next_seq + 1) % self.modulo;
    }

    /// Cumulative advance: set `base = ack + 1` and clear every slot passed
    /// over. The caller checks [`SendWindow::contains`] first.
    pub fn advance_to(&mut self, ack: u32) {
        debug_assert!(self.contains(ack as i32));
        let target = (ack + 1) % self.modulo;
        while self.base != target {
            self.slots[self.base as usize] = None;
            self.base = (self.base + 1) % self.modulo;
        }
    }

    /// Iterate buffered packets over `[base, next_seq)` in window order.
    pub fn unacked(&self) -> impl Iterator<Item = &Packet> + '_ {
        (0..self.occupancy()).filter_map(move |i| {
            let idx = ((self.base + i) % self.modulo) as usize;
            self.slots[idx].as_ref()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{SEQ_MODULO, WINDOW_SIZE};
    use bytes::Bytes;

    fn window() -> SendWindow {
        SendWindow::new(SEQ_MODULO, WINDOW_SIZE)
    }

    fn fill(w: &mut SendWindow, n: u32) {
        for _ in 0..n {
            let seq = w.next_seq() as i32;
            w.push(Packet::data(seq, Bytes::from_static(b"x")));
        }
    }

    #[test]
    fn occupancy_tracks_pushes() {
        let mut w = window();
        assert!(w.is_empty());
        fill(&mut w, 3);
        assert_eq!(w.occupancy(), 3);
        assert!(!w.is_full());
        fill(&mut w, 7);
        assert!(w.is_full());
        assert_eq!(w.occupancy(), WINDOW_SIZE);
    }

    #[test]
    fn occupancy_across_wrap() {
        let mut w = window();
        // Walk base and next_seq to 30.
        for _ in 0..30 {
            let seq = w.next_seq();
            fill(&mut w, 1);
            w.advance_to(seq);
        }
        assert_eq!(w.base(), 30);
        fill(&mut w, 8);
        assert_eq!(w.next_seq(), 6);
        assert_eq!(w.occupancy(), 8);
    }

    #[test]
    fn contains_is_circular() {
        let mut w = window();
        for _ in 0..28 {
            let seq = w.next_seq();
            fill(&mut w, 1);
            w.advance_to(seq);
        }
        fill(&mut w, 6); // window is [28, 2)
        assert!(w.contains(28));
        assert!(w.contains(31));
        assert!(w.contains(0));
        assert!(w.contains(1));
        assert!(!w.contains(2));
        assert!(!w.contains(27));
        assert!(!w.contains(-1));
    }

    #[test]
    fn advance_clears_passed_slots() {
        let mut w = window();
        fill(&mut w, 5);
        w.advance_to(2);
        assert_eq!(w.base(), 3);
        assert_eq!(w.occupancy(), 2);
        let seqs: Vec<i32> = w.unacked().map(|p| p.seq).collect();
        assert_eq!(seqs, vec![3, 4]);
    }

    #[test]
    fn unacked_preserves_order_across_wrap() {
        let mut w = window();
        for _ in 0..29 {
            let seq = w.next_seq();
            fill(&mut w, 1);
            w.advance_to(seq);
        }
        fill(&mut w, 6); // [29, 3)
        let seqs: Vec<i32> = w.unacked().map(|p| p.seq).collect();
        assert_eq!(seqs, vec![29, 30, 31, 0, 1, 2]);
    }

    #[test]
    fn bump_consumes_a_sequence_without_a_slot() {
        let mut w = window();
        fill(&mut w, 1);
        w.advance_to(0);
        w.bump_next_seq();
        assert_eq!(w.next_seq(), 2);
        assert_eq!(w.occupancy(), 1);
        assert_eq!(w.unacked().count(), 0);
    }
}
