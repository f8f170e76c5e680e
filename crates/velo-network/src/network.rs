//! Road network topology and builder.
//!
//! # Data layout
//!
//! Edge attributes are stored as parallel arrays indexed by `EdgeId`, where
//! `EdgeId` is the edge's insertion order in the builder.  External feeds
//! refer to edges by that id, so it never changes after `build()`.
//!
//! Adjacency uses **Compressed Sparse Row (CSR)** permutation arrays in both
//! directions.  Given a `NodeId n`, its outgoing edges are:
//!
//! ```text
//! out_edge_ids[ out_start[n] .. out_start[n+1] ]
//! ```
//!
//! and its incoming edges are the same slice of `in_edge_ids` / `in_start`.
//! The reverse CSR lets rollouts run one backward search from the
//! destination instead of one forward search per candidate.
//!
//! Only static attributes live here.  Closure flags and traffic multipliers
//! change over time and live in [`GraphVersion`](crate::GraphVersion).
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(lat, lon)` to the nearest `NodeId`.  Used to
//! snap geographic rider positions to intersections and to find the edges
//! near the rider that rollouts perturb.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use velo_core::{EdgeId, GeoPoint, NodeId, RoadClass};

use crate::{NetworkError, NetworkResult};

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D `[lat, lon]` point with
/// the associated `NodeId`.
#[derive(Clone, Debug)]
struct NodeEntry {
    point: [f32; 2], // [lat, lon]
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lat/lon space.  Sufficient for
    /// nearest-node queries within a city (error < 0.1 % at ≤ 60° lat).
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── EdgeSpec ──────────────────────────────────────────────────────────────────

/// Static attributes of one directed edge.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EdgeSpec {
    /// Physical length in metres.  Must be finite and > 0.
    pub length_m: f32,
    pub class: RoadClass,
    /// Base safety score in `[0, 1]`, 1 = safest.
    pub safety_score: f32,
}

impl EdgeSpec {
    /// Spec with the class's default safety score.
    pub fn new(length_m: f32, class: RoadClass) -> Self {
        Self { length_m, class, safety_score: default_safety_score(class) }
    }

    pub fn with_safety_score(mut self, score: f32) -> Self {
        self.safety_score = score;
        self
    }
}

/// Safety score assumed when a data source does not provide one.
pub fn default_safety_score(class: RoadClass) -> f32 {
    match class {
        RoadClass::Service  => 1.0,
        RoadClass::Internal => 0.8,
        RoadClass::Arterial => 0.5,
        RoadClass::Highway  => 0.1,
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed road graph with forward and reverse CSR adjacency plus a spatial
/// index for node snapping.
///
/// Fields are `pub` for direct indexed access on hot paths.  Do not construct
/// directly; use [`RoadNetworkBuilder`].
#[derive(Debug)]
pub struct RoadNetwork {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    // ── CSR adjacency ─────────────────────────────────────────────────────
    /// Row pointer for outgoing edges.  Length = `node_count + 1`.
    pub out_start: Vec<u32>,
    /// Outgoing `EdgeId`s grouped by source node.
    pub out_edge_ids: Vec<EdgeId>,
    /// Row pointer for incoming edges.  Length = `node_count + 1`.
    pub in_start: Vec<u32>,
    /// Incoming `EdgeId`s grouped by destination node.
    pub in_edge_ids: Vec<EdgeId>,

    // ── Edge data (indexed by EdgeId) ─────────────────────────────────────
    pub edge_from: Vec<NodeId>,
    pub edge_to: Vec<NodeId>,
    /// Length of each edge in metres.
    pub edge_length_m: Vec<f32>,
    pub edge_class: Vec<RoadClass>,
    pub edge_safety: Vec<f32>,

    // ── Spatial index ─────────────────────────────────────────────────────
    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    /// Construct an empty network with no nodes or edges.
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().assemble()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    #[inline]
    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.node_count()
    }

    #[inline]
    pub fn contains_edge(&self, edge: EdgeId) -> bool {
        edge.index() < self.edge_count()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.out_start[node.index()] as usize;
        let end   = self.out_start[node.index() + 1] as usize;
        self.out_edge_ids[start..end].iter().copied()
    }

    /// Iterator over the `EdgeId`s of all incoming edges to `node`.
    #[inline]
    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.in_start[node.index()] as usize;
        let end   = self.in_start[node.index() + 1] as usize;
        self.in_edge_ids[start..end].iter().copied()
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        (self.out_start[node.index() + 1] - self.out_start[node.index()]) as usize
    }

    /// First edge `from → to`, if any.
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        if !self.contains_node(from) {
            return None;
        }
        self.out_edges(from).find(|e| self.edge_to[e.index()] == to)
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the `NodeId` of the nearest road node to `pos`.
    ///
    /// Returns `None` only if the network has no nodes.
    pub fn snap_to_node(&self, pos: GeoPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.lat, pos.lon])
            .map(|e| e.id)
    }

    /// Return up to `k` nearest nodes to `pos`, sorted by ascending distance.
    pub fn k_nearest_nodes(&self, pos: GeoPoint, k: usize) -> Vec<NodeId> {
        self.spatial_idx
            .nearest_neighbor_iter(&[pos.lat, pos.lon])
            .take(k)
            .map(|e| e.id)
            .collect()
    }

    /// All nodes within `radius_m` metres (haversine) of `pos`, ascending id.
    pub fn nodes_within(&self, pos: GeoPoint, radius_m: f32) -> Vec<NodeId> {
        let half = pos.bbox_half_deg(radius_m);
        let envelope = AABB::from_corners(
            [pos.lat - half, pos.lon - half],
            [pos.lat + half, pos.lon + half],
        );
        let mut nodes: Vec<NodeId> = self
            .spatial_idx
            .locate_in_envelope(&envelope)
            .filter(|e| GeoPoint::new(e.point[0], e.point[1]).distance_m(pos) <= radius_m)
            .map(|e| e.id)
            .collect();
        nodes.sort_unstable();
        nodes
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use velo_core::{GeoPoint, RoadClass};
/// use velo_network::{EdgeSpec, RoadNetworkBuilder};
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_node(GeoPoint::new(28.600, 77.046));
/// let c = b.add_node(GeoPoint::new(28.601, 77.047));
/// b.add_road(a, c, EdgeSpec::new(150.0, RoadClass::Service));
/// let net = b.build().unwrap();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// ```
pub struct RoadNetworkBuilder {
    nodes:     Vec<GeoPoint>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from: NodeId,
    to:   NodeId,
    spec: EdgeSpec,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), raw_edges: Vec::new() }
    }

    /// Add a road node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add a **directed** edge from `from` to `to` and return its `EdgeId`.
    ///
    /// Attributes are validated in [`build`](Self::build).
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId, spec: EdgeSpec) -> EdgeId {
        let id = EdgeId(self.raw_edges.len() as u32);
        self.raw_edges.push(RawEdge { from, to, spec });
        id
    }

    /// Add edges in **both directions** for a two-way segment.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, spec: EdgeSpec) -> (EdgeId, EdgeId) {
        let ab = self.add_directed_edge(a, b, spec);
        let ba = self.add_directed_edge(b, a, spec);
        (ab, ba)
    }

    /// Look up the position of a node added earlier.
    pub fn node_pos(&self, id: NodeId) -> Option<GeoPoint> {
        self.nodes.get(id.index()).copied()
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Validate every edge and produce a [`RoadNetwork`].
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidEdge`] if an edge references an unknown node,
    /// has a non-positive or non-finite length, or a safety score outside
    /// `[0, 1]`.
    pub fn build(self) -> NetworkResult<RoadNetwork> {
        let node_count = self.nodes.len();
        for e in &self.raw_edges {
            let reason = if e.from.index() >= node_count || e.to.index() >= node_count {
                Some("unknown endpoint")
            } else if !(e.spec.length_m.is_finite() && e.spec.length_m > 0.0) {
                Some("length must be finite and > 0")
            } else if !(0.0..=1.0).contains(&e.spec.safety_score) {
                Some("safety score must be in [0, 1]")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(NetworkError::InvalidEdge {
                    from: e.from,
                    to: e.to,
                    reason: reason.to_string(),
                });
            }
        }
        Ok(self.assemble())
    }

    /// Build CSR arrays and the R-tree.  Assumes edges are valid.
    ///
    /// Time complexity: O(N + E) for CSR + O(N log N) for the R-tree bulk
    /// load, where N = nodes, E = edges.
    fn assemble(self) -> RoadNetwork {
        let node_count = self.nodes.len();
        let raw = self.raw_edges;

        let edge_from:     Vec<NodeId>    = raw.iter().map(|e| e.from).collect();
        let edge_to:       Vec<NodeId>    = raw.iter().map(|e| e.to).collect();
        let edge_length_m: Vec<f32>       = raw.iter().map(|e| e.spec.length_m).collect();
        let edge_class:    Vec<RoadClass> = raw.iter().map(|e| e.spec.class).collect();
        let edge_safety:   Vec<f32>       = raw.iter().map(|e| e.spec.safety_score).collect();

        let (out_start, out_edge_ids) = csr(node_count, &edge_from);
        let (in_start, in_edge_ids)   = csr(node_count, &edge_to);

        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry {
                point: [pos.lat, pos.lon],
                id: NodeId(i as u32),
            })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        RoadNetwork {
            node_pos: self.nodes,
            out_start,
            out_edge_ids,
            in_start,
            in_edge_ids,
            edge_from,
            edge_to,
            edge_length_m,
            edge_class,
            edge_safety,
            spatial_idx,
        }
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Counting-sort edges by `key[edge]` into a CSR row pointer + permutation.
/// Edges with the same key keep ascending `EdgeId` order.
fn csr(node_count: usize, key: &[NodeId]) -> (Vec<u32>, Vec<EdgeId>) {
    let mut start = vec![0u32; node_count + 1];
    for n in key {
        start[n.index() + 1] += 1;
    }
    for i in 1..=node_count {
        start[i] += start[i - 1];
    }
    debug_assert_eq!(start[node_count] as usize, key.len());

    let mut cursor = start.clone();
    let mut ids = vec![EdgeId::INVALID; key.len()];
    for (i, n) in key.iter().enumerate() {
        let slot = &mut cursor[n.index()];
        ids[*slot as usize] = EdgeId(i as u32);
        *slot += 1;
    }
    (start, ids)
}
