//! Unidirectional lossy UDP relay — the "emulator" of the reliable-transport
//! exercise. Run one instance per direction:
//!
//! ```text
//! relink-relay 4000 127.0.0.1:7654 --loss 0.2 --seed 1   # sender → receiver
//! relink-relay 4001 127.0.0.1:6653                       # receiver → sender
//! ```
//!
//! Loss is Bernoulli from a seeded RNG, so a run can be replayed exactly.
//! EOT frames always pass — the teardown handshake has no retransmission
//! timer to cover their loss.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;
use relink_transport::wire::{Packet, PacketKind};
use tokio::net::UdpSocket;
use tracing_subscriber::EnvFilter;

/// Lossy one-way datagram relay.
#[derive(Parser, Debug)]
#[command(name = "relink-relay", about = "Unidirectional lossy UDP relay")]
struct Cli {
    /// UDP port to listen on.
    in_port: u16,

    /// Destination for every surviving datagram.
    forward_to: SocketAddr,

    /// Probability of dropping a DATA or ACK frame.
    #[arg(long, default_value_t = 0.0)]
    loss: f64,

    /// RNG seed for reproducible loss patterns.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let socket = UdpSocket::bind(("0.0.0.0", cli.in_port))
        .await
        .with_context(|| format!("binding udp port {}", cli.in_port))?;
    tracing::info!(
        in_port = cli.in_port,
        forward_to = %cli.forward_to,
        loss = cli.loss,
        "relay listening"
    );

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut buf = vec![0u8; 2048];

    loop {
        let (len, _) = socket.recv_from(&mut buf).await?;
        // Peek at the frame so EOTs are exempt from loss; anything that does
        // not parse is relayed untouched — dropping malformed input is the
        // endpoints' business.
        let is_eot = matches!(
            Packet::decode(&mut &buf[..len]),
            Ok(Packet {
                kind: PacketKind::Eot,
                ..
            })
        );
        if !is_eot && rng.random::<f64>() < cli.loss {
            tracing::debug!(len, "datagram dropped");
            continue;
        }
        socket.send_to(&buf[..len], cli.forward_to).await?;
    }
}
