//! Planning requests and the plans they produce.

use velo_core::{EdgeId, NodeId, Timestamp};
use velo_network::{GraphVersion, RoadNetwork};

/// One planning query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlanRequest {
    pub origin:      NodeId,
    pub destination: NodeId,
    /// Wall-clock time stamped onto the resulting plan.
    pub now:         Timestamp,
}

impl PlanRequest {
    pub fn new(origin: NodeId, destination: NodeId, now: Timestamp) -> Self {
        Self { origin, destination, now }
    }
}

/// A committed route from `origin` to `destination`.
///
/// Every edge is open in graph version `version`, and consecutive edges share
/// endpoints.  Plans are immutable; a replan produces a new `RoutePlan`.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutePlan {
    pub origin:      NodeId,
    pub destination: NodeId,
    /// Edges to traverse in order.  Empty iff `origin == destination`.
    pub edges:       Vec<EdgeId>,
    /// Unperturbed cost of `edges` in `version`.
    pub total_cost:  f64,
    /// Aggregated rollout cost of the chosen first edge.  Equals
    /// `total_cost` when no rollout informed the choice.
    pub expected_cost: f64,
    /// Graph version the plan was computed against.
    pub version:     u64,
    pub generated_at: Timestamp,
    /// `true` if fewer rollouts completed than were requested, or if the
    /// planner fell back to the baseline route after repeated stale reads.
    pub approximate: bool,
    pub samples_completed: usize,
    pub samples_requested: usize,
}

impl RoutePlan {
    /// `true` if the rider is already at the destination.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains_edge(&self, edge: EdgeId) -> bool {
        self.edges.contains(&edge)
    }

    /// Nodes visited, `origin` first and `destination` last.
    pub fn nodes(&self, network: &RoadNetwork) -> Vec<NodeId> {
        let mut nodes = Vec::with_capacity(self.edges.len() + 1);
        nodes.push(self.origin);
        nodes.extend(self.edges.iter().map(|e| network.edge_to[e.index()]));
        nodes
    }

    /// `true` if the edges form a path from `origin` to `destination`.
    pub fn is_connected(&self, network: &RoadNetwork) -> bool {
        let mut at = self.origin;
        for e in &self.edges {
            if !network.contains_edge(*e) || network.edge_from[e.index()] != at {
                return false;
            }
            at = network.edge_to[e.index()];
        }
        at == self.destination
    }

    /// `true` if no plan edge is closed in `version`.
    pub fn is_open_in(&self, version: &GraphVersion) -> bool {
        self.edges.iter().all(|e| !version.is_closed(*e))
    }

    /// Plan edges closed in `version`, in route order.
    pub fn closed_edges_in(&self, version: &GraphVersion) -> Vec<EdgeId> {
        self.edges.iter().copied().filter(|e| version.is_closed(*e)).collect()
    }
}
