//! # Transfer Statistics
//!
//! Per-side counters for a single transfer, JSON-serializable for
//! post-mortem inspection.

use serde::Serialize;

// ─── Sender Stats ───────────────────────────────────────────────────────────

/// Sender-side counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SenderStats {
    /// Fresh DATA packets sent (excluding retransmissions).
    pub packets_sent: u64,
    /// DATA packets resent after a timeout.
    pub retransmissions: u64,
    /// In-window ACKs that advanced `base`.
    pub acks_received: u64,
    /// ACKs outside the window (duplicates, stale, `-1` sentinel).
    pub acks_ignored: u64,
    /// Retransmission timer fires.
    pub timeouts: u64,
}

impl SenderStats {
    /// Retransmission overhead ratio.
    pub fn retransmit_ratio(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.retransmissions as f64 / self.packets_sent as f64
        }
    }
}

// ─── Receiver Stats ─────────────────────────────────────────────────────────

/// Receiver-side counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReceiverStats {
    /// DATA packets received, in order or not.
    pub packets_received: u64,
    /// DATA packets delivered to the output file.
    pub delivered: u64,
    /// Out-of-order or duplicate DATA discarded.
    pub duplicates: u64,
    /// EOT packets received.
    pub eots: u64,
}
