//! # Topology Database
//!
//! Accumulates the facts carried by flooded LSAs: which routers are known to
//! touch each link, and what each link costs. The weighted graph is derived
//! from those facts — an undirected edge `(u, v)` exists exactly when some
//! link's endpoint set holds the two distinct routers `u` and `v`.
//!
//! Everything is keyed by integer ids in ordered maps, so the derived edge
//! list has a stable order for rendering.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Cost, LinkId, RouterId};

/// An undirected edge materialized from the link database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: RouterId,
    pub to: RouterId,
    pub link_id: LinkId,
    pub cost: Cost,
}

/// Adjacency map: `u → v → (link_id, cost)`, kept symmetric.
pub type Adjacency = BTreeMap<RouterId, BTreeMap<RouterId, (LinkId, Cost)>>;

/// The link-fact store.
#[derive(Debug, Default)]
pub struct Topology {
    endpoints: BTreeMap<LinkId, BTreeSet<RouterId>>,
    costs: BTreeMap<LinkId, Cost>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `router` touches `link_id`.
    pub fn record_endpoint(&mut self, link_id: LinkId, router: RouterId) {
        self.endpoints.entry(link_id).or_default().insert(router);
    }

    /// Record (or update) the cost of `link_id`.
    pub fn set_cost(&mut self, link_id: LinkId, cost: Cost) {
        self.costs.insert(link_id, cost);
    }

    pub fn cost_of(&self, link_id: LinkId) -> Option<Cost> {
        self.costs.get(&link_id).copied()
    }

    /// Links whose two endpoints are both known, as undirected edges in
    /// ascending `link_id` order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.endpoints.iter().filter_map(|(&link_id, routers)| {
            if routers.len() != 2 {
                return None;
            }
            let mut it = routers.iter();
            let (&u, &v) = (it.next()?, it.next()?);
            let cost = self.cost_of(link_id)?;
            Some(Edge {
                from: u,
                to: v,
                link_id,
                cost,
            })
        })
    }

    /// Derive the symmetric adjacency map.
    pub fn adjacency(&self) -> Adjacency {
        let mut adj: Adjacency = BTreeMap::new();
        for edge in self.edges() {
            adj.entry(edge.from)
                .or_default()
                .insert(edge.to, (edge.link_id, edge.cost));
            adj.entry(edge.to)
                .or_default()
                .insert(edge.from, (edge.link_id, edge.cost));
        }
        adj
    }

    /// Both directions of every materialized edge, sorted by `(u, v)` —
    /// the rendering order of the topology file.
    pub fn directed_edges(&self) -> Vec<Edge> {
        let mut out: Vec<Edge> = self
            .edges()
            .flat_map(|e| {
                [
                    e,
                    Edge {
                        from: e.to,
                        to: e.from,
                        ..e
                    },
                ]
            })
            .collect();
        out.sort_by_key(|e| (e.from, e.to));
        out
    }
}
