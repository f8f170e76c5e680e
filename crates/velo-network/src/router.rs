//! Routing trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! The planner calls routing via the [`Router`] trait, so applications can
//! swap in A* or contraction hierarchies without touching the rollout logic.
//!
//! # Cost realizations
//!
//! Searches take edge costs as a `&[f64]` slice indexed by `EdgeId` rather
//! than reading a [`GraphVersion`] directly.  The planner computes the base
//! costs of a version once, then hands each rollout its own perturbed copy.
//! Non-finite entries are impassable.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use velo_core::{EdgeId, NodeId};

use crate::{CostModel, GraphVersion, NetworkError, NetworkResult, RoadNetwork};

/// Heap pops between deadline checks.
const DEADLINE_CHECK_INTERVAL: u32 = 256;

// ── SearchDeadline ────────────────────────────────────────────────────────────

/// Optional wall-clock cutoff for a search.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchDeadline(Option<Instant>);

impl SearchDeadline {
    /// Never expires.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.0.is_some_and(|d| Instant::now() >= d)
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query: an ordered list of `EdgeId`s and the total
/// cost under the cost slice the search used.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Edges to traverse in order, from source to destination.
    pub edges: Vec<EdgeId>,
    pub total_cost: f64,
}

impl Route {
    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    /// Nodes visited, source first.  Empty for a trivial route.
    pub fn nodes(&self, network: &RoadNetwork) -> Vec<NodeId> {
        let Some(first) = self.edges.first() else {
            return Vec::new();
        };
        let mut nodes = Vec::with_capacity(self.edges.len() + 1);
        nodes.push(network.edge_from[first.index()]);
        nodes.extend(self.edges.iter().map(|e| network.edge_to[e.index()]));
        nodes
    }

    /// `true` if each edge starts where the previous one ended.
    pub fn is_connected(&self, network: &RoadNetwork) -> bool {
        self.edges
            .windows(2)
            .all(|w| network.edge_to[w[0].index()] == network.edge_from[w[1].index()])
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so they can be shared across Rayon
/// worker threads during parallel rollouts.
pub trait Router: Send + Sync {
    /// Least-cost route from `from` to `to` under `costs`.
    ///
    /// `from == to` yields an empty route.  Returns
    /// [`NetworkError::NoRoute`] if every path crosses an impassable edge and
    /// [`NetworkError::Interrupted`] if `deadline` passes mid-search.
    fn shortest_path(
        &self,
        network: &RoadNetwork,
        costs: &[f64],
        from: NodeId,
        to: NodeId,
        deadline: SearchDeadline,
    ) -> NetworkResult<Route>;

    /// Least cost from every node to `target` under `costs`, indexed by
    /// `NodeId`.  Unreachable nodes get `∞`.
    fn costs_to(
        &self,
        network: &RoadNetwork,
        costs: &[f64],
        target: NodeId,
        deadline: SearchDeadline,
    ) -> NetworkResult<Vec<f64>>;

    /// Unperturbed least-cost route in `version` under `model`.
    fn route(
        &self,
        version: &GraphVersion,
        model: &CostModel,
        from: NodeId,
        to: NodeId,
    ) -> NetworkResult<Route> {
        let costs = model.costs(version);
        self.shortest_path(version.network(), &costs, from, to, SearchDeadline::none())
    }
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Dijkstra's algorithm over the CSR road graph, forward for
/// [`shortest_path`](Router::shortest_path) and over the reverse CSR for
/// [`costs_to`](Router::costs_to).
///
/// Ties are broken by lower `NodeId`, so the same inputs always yield the
/// same route.
#[derive(Copy, Clone, Debug, Default)]
pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn shortest_path(
        &self,
        network: &RoadNetwork,
        costs: &[f64],
        from: NodeId,
        to: NodeId,
        deadline: SearchDeadline,
    ) -> NetworkResult<Route> {
        check_node(network, from)?;
        check_node(network, to)?;
        if from == to {
            return Ok(Route { edges: vec![], total_cost: 0.0 });
        }

        let n = network.node_count();
        let mut dist      = vec![f64::INFINITY; n];
        // prev_edge[v] = EdgeId that reached v; EdgeId::INVALID for unreached nodes.
        let mut prev_edge = vec![EdgeId::INVALID; n];
        dist[from.index()] = 0.0;

        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry { cost: 0.0, node: from });
        let mut pops = 0u32;

        while let Some(HeapEntry { cost, node }) = heap.pop() {
            pops += 1;
            if pops % DEADLINE_CHECK_INTERVAL == 0 && deadline.expired() {
                return Err(NetworkError::Interrupted);
            }
            if node == to {
                return Ok(reconstruct(network, &prev_edge, to, cost));
            }
            // Skip stale heap entries.
            if cost > dist[node.index()] {
                continue;
            }

            for edge in network.out_edges(node) {
                let c = edge_cost(costs, edge);
                if !c.is_finite() {
                    continue;
                }
                let neighbor = network.edge_to[edge.index()];
                let new_cost = cost + c;
                if new_cost < dist[neighbor.index()] {
                    dist[neighbor.index()] = new_cost;
                    prev_edge[neighbor.index()] = edge;
                    heap.push(HeapEntry { cost: new_cost, node: neighbor });
                }
            }
        }

        Err(NetworkError::NoRoute { from, to })
    }

    fn costs_to(
        &self,
        network: &RoadNetwork,
        costs: &[f64],
        target: NodeId,
        deadline: SearchDeadline,
    ) -> NetworkResult<Vec<f64>> {
        check_node(network, target)?;

        let mut dist = vec![f64::INFINITY; network.node_count()];
        dist[target.index()] = 0.0;

        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry { cost: 0.0, node: target });
        let mut pops = 0u32;

        while let Some(HeapEntry { cost, node }) = heap.pop() {
            pops += 1;
            if pops % DEADLINE_CHECK_INTERVAL == 0 && deadline.expired() {
                return Err(NetworkError::Interrupted);
            }
            if cost > dist[node.index()] {
                continue;
            }

            for edge in network.in_edges(node) {
                let c = edge_cost(costs, edge);
                if !c.is_finite() {
                    continue;
                }
                let pred = network.edge_from[edge.index()];
                let new_cost = cost + c;
                if new_cost < dist[pred.index()] {
                    dist[pred.index()] = new_cost;
                    heap.push(HeapEntry { cost: new_cost, node: pred });
                }
            }
        }

        Ok(dist)
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

/// Min-heap entry: lower cost first, then lower `NodeId`.
#[derive(Copy, Clone, Debug)]
struct HeapEntry {
    cost: f64,
    node: NodeId,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap (max) pops the cheapest entry.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

#[inline]
fn edge_cost(costs: &[f64], edge: EdgeId) -> f64 {
    costs.get(edge.index()).copied().unwrap_or(f64::INFINITY)
}

fn check_node(network: &RoadNetwork, node: NodeId) -> NetworkResult<()> {
    if network.contains_node(node) {
        Ok(())
    } else {
        Err(NetworkError::NodeNotFound(node))
    }
}

fn reconstruct(network: &RoadNetwork, prev_edge: &[EdgeId], to: NodeId, total_cost: f64) -> Route {
    let mut edges = Vec::new();
    let mut cur = to;
    loop {
        let e = prev_edge[cur.index()];
        if e == EdgeId::INVALID {
            break;
        }
        edges.push(e);
        cur = network.edge_from[e.index()];
    }
    edges.reverse();
    Route { edges, total_cost }
}
