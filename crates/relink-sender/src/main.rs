//! Go-Back-N sender daemon.
//!
//! Reads the source file in fixed-size chunks and drives the
//! [`GbnSender`] state machine from a single `select!` loop over the
//! incoming ACK/EOT socket and the retransmission deadline. The producer is
//! event-driven: chunks are offered whenever the window has room, so a full
//! window simply pauses reading until an ACK frees a slot.
//!
//! Side artifacts: every DATA transmission appends its sequence number to
//! the `seqnum` sink; every received ACK appends to the `ack` sink.

use std::fs::File;
use std::io::{BufReader, Read};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use relink_common::sink::LineSink;
use relink_transport::sender::{GbnSender, SendOutcome, SenderConfig, SenderEvent};
use relink_transport::wire::{
    DecodeError, Packet, PacketKind, MAX_DATA_LEN, RETRANSMIT_TIMEOUT, SEQ_MODULO, WINDOW_SIZE,
};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

/// Reliable file transmission over the lossy emulator.
#[derive(Parser, Debug)]
#[command(name = "relink-sender", about = "Go-Back-N sender")]
struct Cli {
    /// Emulator hostname or address (forward direction).
    emulator_addr: String,

    /// Emulator UDP port (forward direction).
    emulator_port: u16,

    /// Local UDP port for incoming ACKs and the EOT reply.
    ack_port: u16,

    /// File to transmit.
    filename: PathBuf,

    /// Sliding-window capacity.
    #[arg(long, default_value_t = WINDOW_SIZE)]
    window_size: u32,

    /// Retransmission timeout in milliseconds.
    #[arg(long, default_value_t = RETRANSMIT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Payload bytes per DATA packet.
    #[arg(long, default_value_t = MAX_DATA_LEN)]
    max_data: usize,
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

    let socket = UdpSocket::bind(("0.0.0.0", cli.ack_port))
        .await
        .with_context(|| format!("binding udp port {}", cli.ack_port))?;
    let file = File::open(&cli.filename)
        .with_context(|| format!("opening {}", cli.filename.display()))?;

    tracing::info!(
        %dest,
        ack_port = cli.ack_port,
        file = %cli.filename.display(),
        window = cli.window_size,
        "sender starting"
    );

    run_transfer(&cli, &socket, dest, BufReader::new(file)).await
}

async fn run_transfer(
    cli: &Cli,
    socket: &UdpSocket,
    dest: SocketAddr,
    mut file: impl Read,
) -> Result<()> {
    let mut sender = GbnSender::new(SenderConfig {
        window_size: cli.window_size,
        seq_modulo: SEQ_MODULO,
        max_data_len: cli.max_data,
    });
    let mut seqnum_log = LineSink::create("seqnum")?;
    let mut ack_log = LineSink::create("ack")?;

    let timeout = Duration::from_millis(cli.timeout_ms);
    let mut deadline: Option<Instant> = None;
    let mut pending: Option<Bytes> = None;
    let mut input_done = false;
    let mut buf = vec![0u8; 2048];

    loop {
        // Producer: offer chunks while the window accepts them.
        while !input_done {
            let chunk = match pending.take() {
                Some(c) => c,
                None => match next_chunk(&mut file, cli.max_data)? {
                    Some(c) => c,
                    None => {
                        input_done = true;
                        sender.finish_input();
                        break;
                    }
                },
            };
            match sender.try_send(chunk.clone()) {
                SendOutcome::Queued => {}
                SendOutcome::WindowFull => {
                    pending = Some(chunk);
                    break;
                }
            }
        }

        execute_events(&mut sender, socket, dest, &mut seqnum_log, &mut deadline, timeout).await?;

        if sender.is_complete() {
            break;
        }

        let timer = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                handle_datagram(&buf[..len], &mut sender, &mut ack_log)?;
            }
            () = timer => {
                tracing::debug!(base = sender.base(), "retransmission timeout");
                sender.on_timeout();
            }
        }
    }

    let stats = sender.stats();
    tracing::info!(
        packets_sent = stats.packets_sent,
        retransmissions = stats.retransmissions,
        timeouts = stats.timeouts,
        "transfer complete"
    );
    Ok(())
}

/// Carry out the state machine's queued actions.
async fn execute_events(
    sender: &mut GbnSender,
    socket: &UdpSocket,
    dest: SocketAddr,
    seqnum_log: &mut LineSink,
    deadline: &mut Option<Instant>,
    timeout: Duration,
) -> Result<()> {
    let events: Vec<SenderEvent> = sender.drain_events().collect();
    for event in events {
        match event {
            SenderEvent::Transmit { packet, retransmit } => {
                socket.send_to(&packet.encode(), dest).await?;
                if packet.kind == PacketKind::Data {
                    seqnum_log.record(packet.seq)?;
                }
                tracing::trace!(seq = packet.seq, kind = ?packet.kind, retransmit, "sent");
            }
            SenderEvent::ArmTimer => *deadline = Some(Instant::now() + timeout),
            SenderEvent::CancelTimer => *deadline = None,
        }
    }
    Ok(())
}

fn handle_datagram(raw: &[u8], sender: &mut GbnSender, ack_log: &mut LineSink) -> Result<()> {
    match Packet::decode(&mut &raw[..]) {
        Ok(packet) => match packet.kind {
            PacketKind::Ack => {
                ack_log.record(packet.seq)?;
                sender.handle_ack(packet.seq);
            }
            PacketKind::Eot => sender.handle_eot_reply(),
            PacketKind::Data => tracing::warn!("unexpected DATA at the sender, dropped"),
        },
        Err(DecodeError::UnknownKind(kind)) => {
            tracing::warn!(kind, "unknown packet kind dropped");
        }
        Err(err) => tracing::trace!(%err, "malformed datagram dropped"),
    }
    Ok(())
}

/// Read the next up-to-`max`-byte chunk, or `None` at end of file.
fn next_chunk(file: &mut impl Read, max: usize) -> std::io::Result<Option<Bytes>> {
    let mut buf = vec![0u8; max];
    let mut filled = 0;
    while filled < max {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == 0 {
        return Ok(None);
    }
    buf.truncate(filled);
    Ok(Some(Bytes::from(buf)))
}
