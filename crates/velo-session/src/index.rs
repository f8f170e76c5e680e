//! Node → position lookup over the active plan.

use velo_core::NodeId;
use velo_network::RoadNetwork;
use velo_planner::RoutePlan;

#[cfg(feature = "fx-hash")]
type NodeMap = rustc_hash::FxHashMap<NodeId, usize>;
#[cfg(not(feature = "fx-hash"))]
type NodeMap = std::collections::HashMap<NodeId, usize>;

/// Position of every plan node, `0` for the origin.  Node `i` is the tail of
/// plan edge `i`.
#[derive(Debug, Default)]
pub(crate) struct PlanIndex {
    nodes:     Vec<NodeId>,
    positions: NodeMap,
}

impl PlanIndex {
    pub fn build(plan: &RoutePlan, network: &RoadNetwork) -> Self {
        let nodes = plan.nodes(network);
        let mut positions = NodeMap::default();
        positions.reserve(nodes.len());
        for (i, &n) in nodes.iter().enumerate() {
            positions.entry(n).or_insert(i);
        }
        Self { nodes, positions }
    }

    /// Position of `node` at or after `from`.
    pub fn position_from(&self, node: NodeId, from: usize) -> Option<usize> {
        self.positions.get(&node).copied().filter(|&i| i >= from)
    }

    /// Number of plan edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Nodes from position `from` to the destination.
    pub fn remaining(&self, from: usize) -> &[NodeId] {
        self.nodes.get(from..).unwrap_or(&[])
    }
}
