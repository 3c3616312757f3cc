//! Virtual link-state router daemon.
//!
//! Three phases against the forwarding emulator: INIT (learn incident
//! links), initial flood (advertise them), then the steady-state loop —
//! receive an LSA, dedup, re-flood, recompute shortest paths, and append
//! any changed rendering to the `topology_<rid>` / `routingtable_<rid>`
//! sinks.
//!
//! The loop runs until the process is killed, or — with `--idle-exit-ms` —
//! exits cleanly once the network has been quiet that long (convergence,
//! for scripted runs).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use relink_common::sink::BlockSink;
use relink_routing::msg::{DecodeError, Message};
use relink_routing::router::{RouterCore, RouterEvent};
use relink_routing::RouterId;
use tokio::net::UdpSocket;
use tracing_subscriber::EnvFilter;

/// One virtual router attached to the forwarding emulator.
#[derive(Parser, Debug)]
#[command(name = "relink-router", about = "Link-state virtual router")]
struct Cli {
    /// Emulator hostname or address.
    emulator_addr: String,

    /// Emulator UDP port.
    emulator_port: u16,

    /// This router's unique identifier.
    router_id: RouterId,

    /// Exit 0 after this many milliseconds without traffic.
    #[arg(long)]
    idle_exit_ms: Option<u64>,
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
    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .await
        .context("binding udp socket")?;

    let mut topology_sink = BlockSink::create(&format!("topology_{}", cli.router_id))?;
    let mut routing_sink = BlockSink::create(&format!("routingtable_{}", cli.router_id))?;
    let mut core = RouterCore::new(cli.router_id);
    let mut buf = vec![0u8; 4096];

    // INIT: register and learn our incident links.
    socket
        .send_to(
            &Message::Init(relink_routing::msg::Init {
                router_id: cli.router_id,
            })
            .encode(),
            dest,
        )
        .await?;
    let db = loop {
        let (len, _) = socket.recv_from(&mut buf).await?;
        match Message::decode(&mut &buf[..len]) {
            Ok(Message::CircuitDb(db)) => break db,
            Ok(other) => tracing::warn!(?other, "expected CIRCUIT_DB, dropped"),
            Err(DecodeError::UnknownType(t)) => {
                tracing::warn!(msg_type = t, "unknown message type dropped")
            }
            Err(err) => tracing::trace!(%err, "malformed datagram dropped"),
        }
    };
    if db.links.is_empty() {
        bail!("emulator reported no incident links for router {}", cli.router_id);
    }
    tracing::info!(router = cli.router_id, links = db.links.len(), "initialized");

    core.apply_circuit_db(&db);
    core.initial_flood();
    execute_events(&mut core, &socket, dest, &mut topology_sink, &mut routing_sink).await?;

    // Steady state: flood and recompute until killed (or idle long enough).
    loop {
        let received = match cli.idle_exit_ms {
            Some(ms) => {
                match tokio::time::timeout(
                    Duration::from_millis(ms),
                    socket.recv_from(&mut buf),
                )
                .await
                {
                    Ok(r) => r,
                    Err(_) => {
                        tracing::info!(router = cli.router_id, "idle, assuming convergence");
                        return Ok(());
                    }
                }
            }
            None => socket.recv_from(&mut buf).await,
        };
        let (len, _) = received?;

        match Message::decode(&mut &buf[..len]) {
            Ok(Message::Lsa(lsa)) => {
                core.handle_lsa(lsa);
                execute_events(&mut core, &socket, dest, &mut topology_sink, &mut routing_sink)
                    .await?;
            }
            Ok(other) => tracing::warn!(?other, "unexpected message dropped"),
            Err(DecodeError::UnknownType(t)) => {
                tracing::warn!(msg_type = t, "unknown message type dropped")
            }
            Err(err) => tracing::trace!(%err, "malformed datagram dropped"),
        }
    }
}

/// Carry out the router core's queued actions.
async fn execute_events(
    core: &mut RouterCore,
    socket: &UdpSocket,
    dest: SocketAddr,
    topology_sink: &mut BlockSink,
    routing_sink: &mut BlockSink,
) -> Result<()> {
    let events: Vec<RouterEvent> = core.drain_events().collect();
    for event in events {
        match event {
            RouterEvent::Flood(lsa) => {
                socket.send_to(&Message::Lsa(lsa).encode(), dest).await?;
            }
            RouterEvent::TopologySnapshot(text) => topology_sink.record_block(&text)?,
            RouterEvent::RoutingSnapshot(text) => routing_sink.record_block(&text)?,
        }
    }
    Ok(())
}
