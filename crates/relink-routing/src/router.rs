//! # Virtual Router State Machine
//!
//! Pure logic — no I/O. The daemon performs the INIT exchange, hands the
//! resulting [`CircuitDb`] to [`RouterCore::apply_circuit_db`], triggers the
//! initial flood, then feeds every received LSA to
//! [`RouterCore::handle_lsa`] and executes the drained events:
//!
//! - `Flood(Lsa)` — send this advertisement to the emulator
//! - `TopologySnapshot` / `RoutingSnapshot` — rendered output text, emitted
//!   only when it differs from the previously rendered value
//!
//! Flooding has no split horizon: a fresh LSA is forwarded out every owned
//! link. Termination comes from deduplication — each `(router_id,
//! router_link_id, router_link_cost)` triple is processed at most once.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use crate::msg::{CircuitDb, Lsa};
use crate::spf::{Route, SpfTree};
use crate::topology::Topology;
use crate::{Cost, LinkId, RouterId};

// ─── Events ─────────────────────────────────────────────────────────────────

/// Actions for the daemon to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// Send this LSA to the emulator.
    Flood(Lsa),
    /// The topology rendering changed; append it to the topology file.
    TopologySnapshot(String),
    /// The routing-table rendering changed; append it to the routing file.
    RoutingSnapshot(String),
}

// ─── Router Core ────────────────────────────────────────────────────────────

/// The per-router link-state core.
pub struct RouterCore {
    id: RouterId,
    /// Links incident on this router, from the circuit database.
    links: BTreeMap<LinkId, Cost>,
    topology: Topology,
    seen: HashSet<(RouterId, LinkId, Cost)>,
    routing_table: BTreeMap<RouterId, Route>,
    last_topology: Option<String>,
    last_routes: Option<String>,
    events: Vec<RouterEvent>,
    lsas_processed: u64,
}

impl RouterCore {
    pub fn new(id: RouterId) -> Self {
        RouterCore {
            id,
            links: BTreeMap::new(),
            topology: Topology::new(),
            seen: HashSet::new(),
            routing_table: BTreeMap::new(),
            last_topology: None,
            last_routes: None,
            events: Vec::new(),
            lsas_processed: 0,
        }
    }

    pub fn id(&self) -> RouterId {
        self.id
    }

    /// Install the emulator's reply to our INIT: the set of incident links
    /// and their costs.
    pub fn apply_circuit_db(&mut self, db: &CircuitDb) {
        for &(link_id, cost) in &db.links {
            self.links.insert(link_id, cost);
            self.topology.record_endpoint(link_id, self.id);
            self.topology.set_cost(link_id, cost);
        }
    }

    /// Advertise every incident link once. The advertised triples are
    /// recorded as seen, so copies echoed back through a neighbor are
    /// dropped instead of re-flooded.
    pub fn initial_flood(&mut self) {
        let links: Vec<(LinkId, Cost)> = self.links.iter().map(|(&l, &c)| (l, c)).collect();
        for &(link_id, cost) in &links {
            self.seen.insert((self.id, link_id, cost));
            self.events.push(RouterEvent::Flood(Lsa {
                sender_id: self.id,
                sender_link_id: link_id,
                router_id: self.id,
                router_link_id: link_id,
                router_link_cost: cost,
            }));
        }
    }

    /// Process one received LSA: dedup, forward, absorb into the topology,
    /// recompute shortest paths, re-render outputs on change.
    pub fn handle_lsa(&mut self, lsa: Lsa) {
        if !self.seen.insert(lsa.dedup_key()) {
            tracing::trace!(router = self.id, ?lsa, "duplicate lsa dropped");
            return;
        }
        self.lsas_processed += 1;

        // Forward out every owned link; the advertised triple is preserved.
        for &link_id in self.links.keys() {
            self.events
                .push(RouterEvent::Flood(lsa.forwarded_by(self.id, link_id)));
        }

        // Absorb the advertised fact and the forwarding hop into the
        // database. The hop link demonstrably connects the sender to us.
        self.topology
            .record_endpoint(lsa.router_link_id, lsa.router_id);
        self.topology
            .record_endpoint(lsa.sender_link_id, lsa.sender_id);
        self.topology.record_endpoint(lsa.sender_link_id, self.id);
        self.topology
            .set_cost(lsa.router_link_id, lsa.router_link_cost);

        self.recompute();
    }

    fn recompute(&mut self) {
        let adj = self.topology.adjacency();
        self.routing_table = SpfTree::compute(&adj, self.id).routing_table();

        let topology_text = self.render_topology();
        if self.last_topology.as_deref() != Some(&topology_text) {
            self.events
                .push(RouterEvent::TopologySnapshot(topology_text.clone()));
            self.last_topology = Some(topology_text);
        }

        let routes_text = self.render_routes();
        if self.last_routes.as_deref() != Some(&routes_text) {
            self.events
                .push(RouterEvent::RoutingSnapshot(routes_text.clone()));
            self.last_routes = Some(routes_text);
        }
    }

    /// `TOPOLOGY` header, then both directions of every known edge sorted
    /// by `(from, to)`.
    fn render_topology(&self) -> String {
        let mut out = String::from("TOPOLOGY\n");
        for edge in self.topology.directed_edges() {
            let _ = writeln!(
                out,
                "router:{},router:{},linkid:{},cost:{}",
                edge.from, edge.to, edge.link_id, edge.cost
            );
        }
        out
    }

    /// `ROUTING` header, then `dest:next_hop,total_cost` sorted by dest.
    fn render_routes(&self) -> String {
        let mut out = String::from("ROUTING\n");
        for (dest, route) in &self.routing_table {
            let _ = writeln!(out, "{}:{},{}", dest, route.next_hop, route.cost);
        }
        out
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn drain_events(&mut self) -> impl Iterator<Item = RouterEvent> + '_ {
        self.events.drain(..)
    }

    /// Direct neighbor links of this router.
    pub fn links(&self) -> &BTreeMap<LinkId, Cost> {
        &self.links
    }

    pub fn routing_table(&self) -> &BTreeMap<RouterId, Route> {
        &self.routing_table
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Distinct LSA triples absorbed (excluding our own advertisements).
    pub fn lsas_processed(&self) -> u64 {
        self.lsas_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core_with_links(id: RouterId, links: &[(LinkId, Cost)]) -> RouterCore {
        let mut core = RouterCore::new(id);
        core.apply_circuit_db(&CircuitDb {
            links: links.to_vec(),
        });
        core
    }

    fn floods(events: &[RouterEvent]) -> Vec<Lsa> {
        events
            .iter()
            .filter_map(|e| match e {
                RouterEvent::Flood(lsa) => Some(*lsa),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn initial_flood_advertises_each_link_once() {
        let mut core = core_with_links(1, &[(10, 5), (11, 7)]);
        core.initial_flood();
        let lsas = floods(&core.drain_events().collect::<Vec<_>>());
        assert_eq!(lsas.len(), 2);
        for lsa in &lsas {
            assert_eq!(lsa.sender_id, 1);
            assert_eq!(lsa.router_id, 1);
            assert_eq!(lsa.sender_link_id, lsa.router_link_id);
            assert_eq!(core.links()[&lsa.router_link_id], lsa.router_link_cost);
        }
    }

    #[test]
    fn fresh_lsa_is_forwarded_out_every_owned_link() {
        let mut core = core_with_links(1, &[(10, 5), (11, 7)]);
        core.initial_flood();
        core.drain_events().for_each(drop);

        core.handle_lsa(Lsa {
            sender_id: 2,
            sender_link_id: 10,
            router_id: 2,
            router_link_id: 20,
            router_link_cost: 3,
        });
        let events: Vec<_> = core.drain_events().collect();
        let fwd = floods(&events);
        assert_eq!(fwd.len(), 2);
        for lsa in &fwd {
            assert_eq!(lsa.sender_id, 1);
            assert_eq!((lsa.router_id, lsa.router_link_id, lsa.router_link_cost), (2, 20, 3));
        }
        let out_links: Vec<LinkId> = fwd.iter().map(|l| l.sender_link_id).collect();
        assert_eq!(out_links, vec![10, 11]);
    }

    #[test]
    fn duplicate_lsa_is_dropped_without_any_event() {
        let mut core = core_with_links(1, &[(10, 5)]);
        core.initial_flood();
        core.drain_events().for_each(drop);

        let lsa = Lsa {
            sender_id: 2,
            sender_link_id: 10,
            router_id: 2,
            router_link_id: 20,
            router_link_cost: 3,
        };
        core.handle_lsa(lsa);
        core.drain_events().for_each(drop);

        core.handle_lsa(lsa);
        assert!(core.drain_events().next().is_none());
        assert_eq!(core.lsas_processed(), 1);
    }

    #[test]
    fn own_advertisement_echoed_back_is_dropped() {
        let mut core = core_with_links(1, &[(10, 5)]);
        core.initial_flood();
        core.drain_events().for_each(drop);

        // Neighbor 2 re-floods our own advertisement back to us.
        core.handle_lsa(Lsa {
            sender_id: 2,
            sender_link_id: 10,
            router_id: 1,
            router_link_id: 10,
            router_link_cost: 5,
        });
        assert!(core.drain_events().next().is_none());
    }

    #[test]
    fn hop_link_connects_sender_to_receiver() {
        let mut core = core_with_links(1, &[(10, 5)]);
        core.initial_flood();
        core.drain_events().for_each(drop);

        // 2 advertises its other link 20; it reached us over link 10.
        core.handle_lsa(Lsa {
            sender_id: 2,
            sender_link_id: 10,
            router_id: 2,
            router_link_id: 20,
            router_link_cost: 3,
        });
        let adj = core.topology().adjacency();
        assert_eq!(adj[&1][&2], (10, 5));
    }

    #[test]
    fn snapshots_emitted_only_on_change() {
        let mut core = core_with_links(1, &[(10, 5)]);
        core.initial_flood();
        core.drain_events().for_each(drop);

        core.handle_lsa(Lsa {
            sender_id: 2,
            sender_link_id: 10,
            router_id: 2,
            router_link_id: 10,
            router_link_cost: 5,
        });
        let events: Vec<_> = core.drain_events().collect();
        let topo_snaps = events
            .iter()
            .filter(|e| matches!(e, RouterEvent::TopologySnapshot(_)))
            .count();
        assert_eq!(topo_snaps, 1);

        // A different triple that adds no edge: rendering unchanged, no
        // snapshot.
        core.handle_lsa(Lsa {
            sender_id: 2,
            sender_link_id: 10,
            router_id: 3,
            router_link_id: 99,
            router_link_cost: 8,
        });
        let events: Vec<_> = core.drain_events().collect();
        assert!(events
            .iter()
            .all(|e| !matches!(e, RouterEvent::TopologySnapshot(_))));
    }

    #[test]
    fn topology_rendering_lists_both_directions() {
        let mut core = core_with_links(1, &[(10, 5)]);
        core.initial_flood();
        core.drain_events().for_each(drop);

        core.handle_lsa(Lsa {
            sender_id: 2,
            sender_link_id: 10,
            router_id: 2,
            router_link_id: 10,
            router_link_cost: 5,
        });
        let events: Vec<_> = core.drain_events().collect();
        let text = events
            .iter()
            .find_map(|e| match e {
                RouterEvent::TopologySnapshot(t) => Some(t.clone()),
                _ => None,
            })
            .expect("topology snapshot");
        assert_eq!(
            text,
            "TOPOLOGY\nrouter:1,router:2,linkid:10,cost:5\nrouter:2,router:1,linkid:10,cost:5\n"
        );
    }

    #[test]
    fn routing_rendering_sorted_by_destination() {
        let mut core = core_with_links(1, &[(10, 5), (11, 2)]);
        core.initial_flood();
        core.drain_events().for_each(drop);

        for (sender, link, cost) in [(3u32, 11u32, 2u32), (2, 10, 5)] {
            core.handle_lsa(Lsa {
                sender_id: sender,
                sender_link_id: link,
                router_id: sender,
                router_link_id: link,
                router_link_cost: cost,
            });
        }
        let events: Vec<_> = core.drain_events().collect();
        let text = events
            .iter()
            .rev()
            .find_map(|e| match e {
                RouterEvent::RoutingSnapshot(t) => Some(t.clone()),
                _ => None,
            })
            .expect("routing snapshot");
        assert_eq!(text, "ROUTING\n2:2,5\n3:3,2\n");
    }
}
