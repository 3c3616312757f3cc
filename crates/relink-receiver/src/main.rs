//! Go-Back-N receiver daemon.
//!
//! A single-threaded loop with one suspension point: the blocking receive.
//! Every arriving DATA sequence number goes to the `arrival` sink; in-order
//! payloads are appended to the output file; everything else is answered
//! with the most recent ACK. An EOT from the sender is mirrored back and
//! terminates the process.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use relink_common::sink::LineSink;
use relink_transport::receiver::{GbnReceiver, ReceiverEvent};
use relink_transport::wire::{DecodeError, Packet, PacketKind};
use tokio::net::UdpSocket;
use tracing_subscriber::EnvFilter;

/// Reliable file reception through the lossy emulator.
#[derive(Parser, Debug)]
#[command(name = "relink-receiver", about = "Go-Back-N receiver")]
struct Cli {
    /// Emulator hostname or address (reverse direction).
    emulator_addr: String,

    /// Emulator UDP port (reverse direction).
    emulator_port: u16,

    /// Local UDP port for incoming DATA and EOT.
    in_port: u16,

    /// Output file for the delivered byte stream.
    filename: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let dest = tokio::net::lookup_host((cli.emulator_addr.as_str(), cli.emulator_port))
        .await?
        .next()
        .context("emulator address did not resolve")?;

    let socket = UdpSocket::bind(("0.0.0.0", cli.in_port))
        .await
        .with_context(|| format!("binding udp port {}", cli.in_port))?;
    let mut output = BufWriter::new(
        File::create(&cli.filename)
            .with_context(|| format!("creating {}", cli.filename.display()))?,
    );
    let mut arrival_log = LineSink::create("arrival")?;

    tracing::info!(
        %dest,
        in_port = cli.in_port,
        file = %cli.filename.display(),
        "receiver starting"
    );

    let mut receiver = GbnReceiver::default();
    let mut buf = vec![0u8; 2048];

    'transfer: loop {
        let (len, _) = socket.recv_from(&mut buf).await?;
        let packet = match Packet::decode(&mut &buf[..len]) {
            Ok(packet) => packet,
            Err(DecodeError::UnknownKind(kind)) => {
                tracing::warn!(kind, "unknown packet kind dropped");
                continue;
            }
            Err(err) => {
                tracing::trace!(%err, "malformed datagram dropped");
                continue;
            }
        };
        if packet.kind == PacketKind::Data {
            arrival_log.record(packet.seq)?;
        }

        receiver.handle_packet(packet);
        let events: Vec<ReceiverEvent> = receiver.drain_events().collect();
        for event in events {
            match event {
                ReceiverEvent::Deliver(bytes) => output.write_all(&bytes)?,
                ReceiverEvent::Reply(reply) => {
                    socket.send_to(&reply.encode(), dest).await?;
                }
                ReceiverEvent::Finished => break 'transfer,
            }
        }
    }

    output.flush()?;
    let stats = receiver.stats();
    tracing::info!(
        delivered = stats.delivered,
        duplicates = stats.duplicates,
        "transfer complete"
    );
    Ok(())
}
