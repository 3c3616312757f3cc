//! Network forwarding emulator daemon.
//!
//! Loads the JSON topology, waits for one INIT per router, answers each with
//! its circuit database, then relays LSAs across the link named by each
//! LSA's `sender_link_id` forever (until the routers are killed).

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use relink_routing::msg::{CircuitDb, DecodeError, Message};
use relink_routing::RouterId;
use relink_sim::nfe::{Nfe, TopologySpec};
use tokio::net::UdpSocket;
use tracing_subscriber::EnvFilter;

/// Central forwarding emulator for the virtual routers.
#[derive(Parser, Debug)]
#[command(name = "relink-nfe", about = "Link-state network forwarding emulator")]
struct Cli {
    /// UDP port to listen on.
    port: u16,

    /// Topology description: {"links": {"<id>": [["<r1>", "<r2>"], "<cost>"]}}
    topology: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let raw = std::fs::read_to_string(&cli.topology)
        .with_context(|| format!("reading {}", cli.topology.display()))?;
    let spec = TopologySpec::from_json(&raw)?;
    let nfe = Nfe::new(spec)?;
    let expected_routers = nfe.spec().router_ids();

    let socket = UdpSocket::bind(("0.0.0.0", cli.port))
        .await
        .with_context(|| format!("binding udp port {}", cli.port))?;
    tracing::info!(
        port = cli.port,
        routers = expected_routers.len(),
        links = nfe.spec().links.len(),
        "emulator listening"
    );

    let mut addrs: BTreeMap<RouterId, SocketAddr> = BTreeMap::new();
    let mut buf = vec![0u8; 2048];

    // INIT phase: one registration per router in the topology.
    while addrs.len() < expected_routers.len() {
        let (len, from) = socket.recv_from(&mut buf).await?;
        let init = match Message::decode(&mut &buf[..len]) {
            Ok(Message::Init(init)) => init,
            Ok(other) => {
                tracing::warn!(?other, %from, "expected INIT, dropping");
                continue;
            }
            Err(DecodeError::UnknownType(t)) => {
                tracing::warn!(msg_type = t, %from, "unknown message type dropped");
                continue;
            }
            Err(_) => continue,
        };
        let Some(db) = nfe.circuit_db(init.router_id) else {
            tracing::warn!(router = init.router_id, "INIT from unknown router dropped");
            continue;
        };
        addrs.insert(init.router_id, from);
        reply_circuit_db(&socket, from, &db).await?;
        tracing::info!(router = init.router_id, %from, links = db.links.len(), "router registered");
    }

    tracing::info!("all routers registered, forwarding");

    // Forwarding phase.
    loop {
        let (len, from) = socket.recv_from(&mut buf).await?;
        let lsa = match Message::decode(&mut &buf[..len]) {
            Ok(Message::Lsa(lsa)) => lsa,
            Ok(other) => {
                tracing::warn!(?other, %from, "unexpected message in forwarding phase");
                continue;
            }
            Err(DecodeError::UnknownType(t)) => {
                tracing::warn!(msg_type = t, %from, "unknown message type dropped");
                continue;
            }
            Err(_) => continue,
        };
        let Some(target) = nfe.forward_target(&lsa) else {
            tracing::debug!(?lsa, "undeliverable lsa dropped");
            continue;
        };
        let Some(&target_addr) = addrs.get(&target) else {
            tracing::debug!(target, "target router never registered, dropping");
            continue;
        };
        socket
            .send_to(&Message::Lsa(lsa).encode(), target_addr)
            .await?;
    }
}

async fn reply_circuit_db(socket: &UdpSocket, to: SocketAddr, db: &CircuitDb) -> Result<()> {
    socket
        .send_to(&Message::CircuitDb(db.clone()).encode(), to)
        .await?;
    Ok(())
}
