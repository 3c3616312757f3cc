//! # Shortest Path First
//!
//! Lazy Dijkstra over the derived adjacency map. The heap is keyed by
//! `(tentative cost, router id)`, so ties on cost resolve toward the smaller
//! router id — deterministic across runs. Parents are tracked to extract the
//! next hop: walk from the target back until the vertex whose parent is the
//! source.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::topology::Adjacency;
use crate::{Cost, RouterId};

/// One routing-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub cost: Cost,
    pub next_hop: RouterId,
}

/// Shortest-path tree rooted at one router.
#[derive(Debug)]
pub struct SpfTree {
    source: RouterId,
    dist: BTreeMap<RouterId, Cost>,
    parent: BTreeMap<RouterId, RouterId>,
}

impl SpfTree {
    /// Run Dijkstra from `source` over `adj`.
    pub fn compute(adj: &Adjacency, source: RouterId) -> Self {
        let mut dist: BTreeMap<RouterId, Cost> = BTreeMap::new();
        let mut parent: BTreeMap<RouterId, RouterId> = BTreeMap::new();
        let mut heap: BinaryHeap<Reverse<(Cost, RouterId)>> = BinaryHeap::new();

        dist.insert(source, 0);
        heap.push(Reverse((0, source)));

        while let Some(Reverse((cost, u))) = heap.pop() {
            // Lazy deletion: skip entries superseded by a cheaper path.
            if dist.get(&u).is_some_and(|&d| cost > d) {
                continue;
            }
            let Some(neighbors) = adj.get(&u) else {
                continue;
            };
            for (&v, &(_link, edge_cost)) in neighbors {
                let candidate = cost + edge_cost;
                if dist.get(&v).is_none_or(|&d| candidate < d) {
                    dist.insert(v, candidate);
                    parent.insert(v, u);
                    heap.push(Reverse((candidate, v)));
                }
            }
        }

        SpfTree {
            source,
            dist,
            parent,
        }
    }

    pub fn cost_to(&self, target: RouterId) -> Option<Cost> {
        self.dist.get(&target).copied()
    }

    /// The neighbor of the source on the shortest path to `target`:
    /// follow parent pointers from `target` until the source is next.
    /// `None` when the target is unreachable (or is the source itself).
    pub fn next_hop(&self, target: RouterId) -> Option<RouterId> {
        if target == self.source {
            return None;
        }
        let mut hop = target;
        loop {
            let &up = self.parent.get(&hop)?;
            if up == self.source {
                return Some(hop);
            }
            hop = up;
        }
    }

    /// Routes to every reachable destination other than the source.
    /// Unreachable destinations are omitted.
    pub fn routing_table(&self) -> BTreeMap<RouterId, Route> {
        self.dist
            .iter()
            .filter(|&(&dest, _)| dest != self.source)
            .filter_map(|(&dest, &cost)| {
                let next_hop = self.next_hop(dest)?;
                Some((dest, Route { cost, next_hop }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;

    fn topology(links: &[(u32, u32, u32, u32)]) -> Topology {
        let mut topo = Topology::new();
        for &(link, a, b, cost) in links {
            topo.record_endpoint(link, a);
            topo.record_endpoint(link, b);
            topo.set_cost(link, cost);
        }
        topo
    }

    #[test]
    fn triangle_prefers_the_two_hop_path() {
        // 1—2 costs 1, 2—3 costs 2, 1—3 costs 4: best 1→3 is via 2.
        let topo = topology(&[(1, 1, 2, 1), (2, 2, 3, 2), (3, 1, 3, 4)]);
        let tree = SpfTree::compute(&topo.adjacency(), 1);

        assert_eq!(tree.cost_to(2), Some(1));
        assert_eq!(tree.cost_to(3), Some(3));
        assert_eq!(tree.next_hop(2), Some(2));
        assert_eq!(tree.next_hop(3), Some(2));
    }

    #[test]
    fn path_of_five_routes_through_the_first_hop() {
        let topo = topology(&[
            (10, 1, 2, 10),
            (20, 2, 3, 20),
            (30, 3, 4, 30),
            (40, 4, 5, 40),
        ]);
        let table = SpfTree::compute(&topo.adjacency(), 1).routing_table();

        let expect = [(2u32, 10u32), (3, 30), (4, 60), (5, 100)];
        assert_eq!(table.len(), 4);
        for (dest, cost) in expect {
            let route = table[&dest];
            assert_eq!(route.cost, cost, "cost to {dest}");
            assert_eq!(route.next_hop, 2, "next hop to {dest}");
        }
    }

    #[test]
    fn unreachable_destination_is_omitted() {
        // Two components: 1—2 and 3—4.
        let topo = topology(&[(1, 1, 2, 1), (2, 3, 4, 1)]);
        let tree = SpfTree::compute(&topo.adjacency(), 1);

        assert_eq!(tree.cost_to(3), None);
        assert_eq!(tree.next_hop(3), None);
        let table = tree.routing_table();
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn equal_cost_tie_breaks_toward_smaller_id() {
        // 1—2—4 and 1—3—4 both cost 2.
        let topo = topology(&[(1, 1, 2, 1), (2, 2, 4, 1), (3, 1, 3, 1), (4, 3, 4, 1)]);
        let tree = SpfTree::compute(&topo.adjacency(), 1);

        assert_eq!(tree.cost_to(4), Some(2));
        assert_eq!(tree.next_hop(4), Some(2));
    }

    #[test]
    fn source_has_no_route_to_itself() {
        let topo = topology(&[(1, 1, 2, 1)]);
        let tree = SpfTree::compute(&topo.adjacency(), 1);
        assert!(!tree.routing_table().contains_key(&1));
        assert_eq!(tree.next_hop(1), None);
    }

    #[test]
    fn next_hop_is_always_a_direct_neighbor() {
        let topo = topology(&[
            (1, 1, 2, 2),
            (2, 2, 3, 2),
            (3, 3, 4, 2),
            (4, 1, 4, 10),
        ]);
        let adj = topo.adjacency();
        let table = SpfTree::compute(&adj, 1).routing_table();
        for (dest, route) in &table {
            assert!(
                adj[&1].contains_key(&route.next_hop),
                "next hop {} to {dest} is not adjacent to the source",
                route.next_hop
            );
        }
    }
}
