//! Deterministic emulation toolkit for integration testing.
//!
//! Provides reproducible packet-loss impairment, an in-process Go-Back-N
//! exchange harness, and an in-process network-forwarding emulator for the
//! link-state routers — plus the `relink-nfe` and `relink-relay` binaries
//! for running the daemons against real sockets.

pub mod harness;
pub mod loss;
pub mod nfe;
