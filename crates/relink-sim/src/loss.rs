//! # Loss Impairment
//!
//! Two reproducible drop policies for the emulated channel:
//!
//! - [`DropSchedule`] — scripted drops keyed by packet kind, sequence
//!   number, and transmission attempt ("drop the first transmission of
//!   DATA(2)"), for scenario tests with an exact expected wire trace.
//! - [`SeededLoss`] — Bernoulli loss from a seeded RNG, for soak-style
//!   tests that stay reproducible run to run.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;
use relink_transport::wire::{Packet, PacketKind};

/// Decides the fate of each transmission.
pub trait Impairment {
    /// `true` = the channel eats this transmission.
    fn should_drop(&mut self, packet: &Packet) -> bool;
}

/// Never drops.
#[derive(Debug, Default)]
pub struct Lossless;

impl Impairment for Lossless {
    fn should_drop(&mut self, _packet: &Packet) -> bool {
        false
    }
}

/// Scripted drops: `(kind, seq, attempt)` triples, attempt counted from 1
/// per distinct `(kind, seq)`.
#[derive(Debug, Default)]
pub struct DropSchedule {
    drops: Vec<(PacketKind, i32, u32)>,
    attempts: HashMap<(u32, i32), u32>,
}

impl DropSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the `attempt`-th transmission of `(kind, seq)`.
    pub fn drop_nth(mut self, kind: PacketKind, seq: i32, attempt: u32) -> Self {
        self.drops.push((kind, seq, attempt));
        self
    }
}

impl Impairment for DropSchedule {
    fn should_drop(&mut self, packet: &Packet) -> bool {
        let attempt = self
            .attempts
            .entry((packet.kind as u32, packet.seq))
            .or_insert(0);
        *attempt += 1;
        let attempt = *attempt;
        self.drops
            .iter()
            .any(|&(kind, seq, n)| kind == packet.kind && seq == packet.seq && n == attempt)
    }
}

/// Seeded Bernoulli loss. EOT frames always pass: the teardown handshake
/// has no retransmission timer, so dropping it would stall the exchange
/// rather than exercise recovery.
#[derive(Debug)]
pub struct SeededLoss {
    rng: StdRng,
    loss_rate: f64,
}

impl SeededLoss {
    pub fn new(seed: u64, loss_rate: f64) -> Self {
        SeededLoss {
            rng: StdRng::seed_from_u64(seed),
            loss_rate,
        }
    }
}

impl Impairment for SeededLoss {
    fn should_drop(&mut self, packet: &Packet) -> bool {
        if packet.kind == PacketKind::Eot {
            return false;
        }
        self.rng.random::<f64>() < self.loss_rate
    }
}
