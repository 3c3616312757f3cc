//! # In-Process Network Forwarding Emulator
//!
//! The central process the virtual routers talk to: it answers each INIT
//! with that router's circuit database, then relays every LSA to the single
//! neighbor on the far side of the LSA's `sender_link_id`. LSAs from unknown
//! routers or over links not incident on the sender are dropped.
//!
//! [`Nfe`] validates and serves a [`TopologySpec`]; [`Cluster`] additionally
//! hosts one [`RouterCore`] per router and runs the whole flood to
//! quiescence for convergence tests. The `relink-nfe` binary wraps [`Nfe`]
//! around a real UDP socket.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use anyhow::{bail, Context, Result};
use relink_routing::msg::{CircuitDb, Lsa};
use relink_routing::router::{RouterCore, RouterEvent};
use relink_routing::{Cost, LinkId, RouterId};

// ─── Topology Specification ─────────────────────────────────────────────────

/// One physical link between two routers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSpec {
    pub link_id: LinkId,
    pub a: RouterId,
    pub b: RouterId,
    pub cost: Cost,
}

/// The emulated network: a set of links over implicit routers.
#[derive(Debug, Clone, Default)]
pub struct TopologySpec {
    pub links: Vec<LinkSpec>,
}

impl TopologySpec {
    pub fn new(links: impl IntoIterator<Item = (LinkId, RouterId, RouterId, Cost)>) -> Self {
        TopologySpec {
            links: links
                .into_iter()
                .map(|(link_id, a, b, cost)| LinkSpec { link_id, a, b, cost })
                .collect(),
        }
    }

    /// Parse the emulator's JSON topology file:
    /// `{"links": {"<link_id>": [["<r1>", "<r2>"], "<cost>"]}}`
    /// (ids and costs are decimal strings).
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let links_obj = value
            .get("links")
            .and_then(|v| v.as_object())
            .context("topology file has no \"links\" object")?;

        let parse_int = |v: &serde_json::Value, what: &str| -> Result<u32> {
            v.as_str()
                .with_context(|| format!("{what} is not a string"))?
                .parse::<u32>()
                .with_context(|| format!("{what} is not an integer"))
        };

        let mut links = Vec::new();
        for (link_id_raw, entry) in links_obj {
            let link_id: LinkId = link_id_raw
                .parse()
                .with_context(|| format!("link id {link_id_raw:?} is not an integer"))?;
            let pair = entry
                .get(0)
                .and_then(|v| v.as_array())
                .context("link entry has no router pair")?;
            let a = parse_int(pair.first().context("missing first router")?, "router id")?;
            let b = parse_int(pair.get(1).context("missing second router")?, "router id")?;
            let cost = parse_int(entry.get(1).context("link entry has no cost")?, "link cost")?;
            links.push(LinkSpec { link_id, a, b, cost });
        }
        links.sort_by_key(|l| l.link_id);
        Ok(TopologySpec { links })
    }

    pub fn router_ids(&self) -> BTreeSet<RouterId> {
        self.links.iter().flat_map(|l| [l.a, l.b]).collect()
    }

    /// Reject self-links, duplicate router pairs, and disconnected graphs —
    /// a misconfigured emulator would otherwise fail in confusing ways
    /// mid-flood.
    pub fn validate(&self) -> Result<()> {
        if self.links.is_empty() {
            bail!("topology has no links; at least one link between two routers is required");
        }

        let mut pairs: BTreeSet<(RouterId, RouterId)> = BTreeSet::new();
        let mut ids: BTreeSet<LinkId> = BTreeSet::new();
        for link in &self.links {
            if link.a == link.b {
                bail!("router {} connects to itself over link {}", link.a, link.link_id);
            }
            if !ids.insert(link.link_id) {
                bail!("duplicate link id {}", link.link_id);
            }
            let pair = (link.a.min(link.b), link.a.max(link.b));
            if !pairs.insert(pair) {
                bail!("more than one link between routers {} and {}", pair.0, pair.1);
            }
        }

        // Connectivity: breadth-first from any router.
        let routers = self.router_ids();
        let mut visited: BTreeSet<RouterId> = BTreeSet::new();
        let mut queue: VecDeque<RouterId> = routers.iter().copied().take(1).collect();
        while let Some(r) = queue.pop_front() {
            if !visited.insert(r) {
                continue;
            }
            for link in &self.links {
                let peer = match link.other_end(r) {
                    Some(p) => p,
                    None => continue,
                };
                if !visited.contains(&peer) {
                    queue.push_back(peer);
                }
            }
        }
        if visited != routers {
            bail!("topology is not connected");
        }
        Ok(())
    }
}

impl LinkSpec {
    /// The router on the far side of this link from `router`, if incident.
    pub fn other_end(&self, router: RouterId) -> Option<RouterId> {
        if self.a == router {
            Some(self.b)
        } else if self.b == router {
            Some(self.a)
        } else {
            None
        }
    }
}

// ─── Forwarding Core ────────────────────────────────────────────────────────

/// The emulator's forwarding logic, shared by the in-process cluster and the
/// UDP binary.
#[derive(Debug)]
pub struct Nfe {
    spec: TopologySpec,
}

impl Nfe {
    pub fn new(spec: TopologySpec) -> Result<Self> {
        spec.validate()?;
        Ok(Nfe { spec })
    }

    pub fn spec(&self) -> &TopologySpec {
        &self.spec
    }

    /// The circuit database for `router`: its incident links and costs.
    /// `None` for a router id not in the topology.
    pub fn circuit_db(&self, router: RouterId) -> Option<CircuitDb> {
        let links: Vec<(LinkId, Cost)> = self
            .spec
            .links
            .iter()
            .filter(|l| l.other_end(router).is_some())
            .map(|l| (l.link_id, l.cost))
            .collect();
        if links.is_empty() {
            None
        } else {
            Some(CircuitDb { links })
        }
    }

    /// Where to relay an LSA: the unique neighbor across `sender_link_id`.
    /// `None` (drop) when the link is unknown or not incident on the sender.
    pub fn forward_target(&self, lsa: &Lsa) -> Option<RouterId> {
        self.spec
            .links
            .iter()
            .find(|l| l.link_id == lsa.sender_link_id)
            .and_then(|l| l.other_end(lsa.sender_id))
    }
}

// ─── In-Process Cluster ─────────────────────────────────────────────────────

/// A full in-process deployment: one [`RouterCore`] per router in the
/// topology, exchanging LSAs through the [`Nfe`] until nothing is in
/// flight.
pub struct Cluster {
    nfe: Nfe,
    pub routers: BTreeMap<RouterId, RouterCore>,
    /// Distinct LSAs absorbed across all routers during the last run.
    pub lsas_processed: u64,
    /// LSA deliveries performed by the emulator during the last run.
    pub lsas_forwarded: u64,
    /// Latest snapshot texts per router, in emission order.
    pub topology_snapshots: BTreeMap<RouterId, Vec<String>>,
    pub routing_snapshots: BTreeMap<RouterId, Vec<String>>,
}

impl Cluster {
    pub fn new(spec: TopologySpec) -> Result<Self> {
        let nfe = Nfe::new(spec)?;
        let routers = nfe
            .spec()
            .router_ids()
            .into_iter()
            .map(|id| (id, RouterCore::new(id)))
            .collect();
        Ok(Cluster {
            nfe,
            routers,
            lsas_processed: 0,
            lsas_forwarded: 0,
            topology_snapshots: BTreeMap::new(),
            routing_snapshots: BTreeMap::new(),
        })
    }

    /// Run INIT, the initial floods, and steady-state forwarding until the
    /// network quiesces. Panics on a flood that fails to terminate.
    pub fn converge(&mut self) {
        // INIT phase: every router gets its circuit database.
        let mut in_flight: VecDeque<Lsa> = VecDeque::new();
        let ids: Vec<RouterId> = self.routers.keys().copied().collect();
        for id in &ids {
            let db = self.nfe.circuit_db(*id).expect("router is in the topology");
            let router = self.routers.get_mut(id).expect("router exists");
            router.apply_circuit_db(&db);
            router.initial_flood();
            in_flight.extend(Self::drain(router, &mut self.topology_snapshots, &mut self.routing_snapshots));
        }

        // Steady state: relay until quiet.
        let mut budget = 1_000_000u64;
        while let Some(lsa) = in_flight.pop_front() {
            budget = budget.checked_sub(1).expect("flood did not terminate");
            let target = match self.nfe.forward_target(&lsa) {
                Some(t) => t,
                None => continue,
            };
            self.lsas_forwarded += 1;
            let before = self.routers[&target].lsas_processed();
            let router = self.routers.get_mut(&target).expect("router exists");
            router.handle_lsa(lsa);
            self.lsas_processed += router.lsas_processed() - before;
            in_flight.extend(Self::drain(router, &mut self.topology_snapshots, &mut self.routing_snapshots));
        }
    }

    fn drain(
        router: &mut RouterCore,
        topo: &mut BTreeMap<RouterId, Vec<String>>,
        routes: &mut BTreeMap<RouterId, Vec<String>>,
    ) -> Vec<Lsa> {
        let id = router.id();
        let mut outbound = Vec::new();
        for event in router.drain_events() {
            match event {
                RouterEvent::Flood(lsa) => outbound.push(lsa),
                RouterEvent::TopologySnapshot(text) => topo.entry(id).or_default().push(text),
                RouterEvent::RoutingSnapshot(text) => routes.entry(id).or_default().push(text),
            }
        }
        outbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> TopologySpec {
        TopologySpec::new([(1, 1, 2, 1), (2, 2, 3, 2), (3, 1, 3, 4)])
    }

    #[test]
    fn circuit_db_lists_incident_links() {
        let nfe = Nfe::new(triangle()).unwrap();
        let db = nfe.circuit_db(1).unwrap();
        assert_eq!(db.links, vec![(1, 1), (3, 4)]);
        assert!(nfe.circuit_db(9).is_none());
    }

    #[test]
    fn forwarding_crosses_the_sender_link() {
        let nfe = Nfe::new(triangle()).unwrap();
        let lsa = Lsa {
            sender_id: 1,
            sender_link_id: 1,
            router_id: 1,
            router_link_id: 1,
            router_link_cost: 1,
        };
        assert_eq!(nfe.forward_target(&lsa), Some(2));
    }

    #[test]
    fn unknown_sender_or_link_is_dropped() {
        let nfe = Nfe::new(triangle()).unwrap();
        let mut lsa = Lsa {
            sender_id: 3,
            sender_link_id: 1, // link 1 does not touch router 3
            router_id: 3,
            router_link_id: 2,
            router_link_cost: 2,
        };
        assert_eq!(nfe.forward_target(&lsa), None);
        lsa.sender_link_id = 99;
        assert_eq!(nfe.forward_target(&lsa), None);
    }

    #[test]
    fn validation_rejects_self_links() {
        let spec = TopologySpec::new([(1, 1, 1, 5)]);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validation_rejects_parallel_links() {
        let spec = TopologySpec::new([(1, 1, 2, 5), (2, 2, 1, 7)]);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validation_rejects_disconnected_topologies() {
        let spec = TopologySpec::new([(1, 1, 2, 5), (2, 3, 4, 7)]);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn json_topology_parses_the_original_format() {
        let raw = r#"{
            "links": {
                "1": [["1", "2"], "10"],
                "2": [["2", "3"], "20"],
                "3": [["1", "4"], "30"],
                "4": [["1", "3"], "55"]
            }
        }"#;
        let spec = TopologySpec::from_json(raw).unwrap();
        assert_eq!(spec.links.len(), 4);
        assert_eq!(
            spec.links[0],
            LinkSpec {
                link_id: 1,
                a: 1,
                b: 2,
                cost: 10
            }
        );
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn json_without_links_is_rejected() {
        assert!(TopologySpec::from_json(r#"{"nodes": {}}"#).is_err());
    }
}
