//! CSV road-network loader.
//!
//! # CSV format
//!
//! Two files.  Nodes carry external integer ids (OSM node ids, say) that edges
//! refer to:
//!
//! ```csv
//! node_id,lat,lon
//! 1001,28.5921,77.0460
//! 1002,28.5930,77.0472
//! ```
//!
//! ```csv
//! from,to,length_m,highway,safety_score,oneway
//! 1001,1002,140.5,residential,,no
//! 1002,1003,,primary,0.4,yes
//! ```
//!
//! | Column         | Meaning                                                   |
//! |----------------|-----------------------------------------------------------|
//! | `length_m`     | metres; empty = haversine distance, at least 1 m          |
//! | `highway`      | OSM `highway=*` tag or a class name (`service`, ...)      |
//! | `safety_score` | `[0, 1]`; empty = the class default                       |
//! | `oneway`       | `yes`/`true`/`1` adds one directed edge, otherwise two    |
//!
//! Rows whose `highway` tag is not rideable (`steps`, `construction`, ...) are
//! skipped.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;

use velo_core::{GeoPoint, NodeId, RoadClass};

use crate::{EdgeSpec, NetworkError, NetworkResult, RoadNetwork, RoadNetworkBuilder};

/// Floor for lengths derived from coordinates, so coincident endpoints still
/// give a valid edge.
const MIN_DERIVED_LENGTH_M: f32 = 1.0;

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NodeRecord {
    node_id: u64,
    lat:     f32,
    lon:     f32,
}

#[derive(Deserialize)]
struct EdgeRecord {
    from:         u64,
    to:           u64,
    length_m:     Option<f32>,
    highway:      String,
    safety_score: Option<f32>,
    oneway:       Option<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// A loaded network plus the mapping from external node ids to `NodeId`s.
#[derive(Debug)]
pub struct LoadedNetwork {
    pub network:    RoadNetwork,
    pub node_index: HashMap<u64, NodeId>,
}

/// Load a road network from node and edge CSV files.
///
/// # Errors
///
/// [`NetworkError::Io`] if a file cannot be opened, [`NetworkError::Csv`] on
/// malformed rows or unknown node references, and [`NetworkError::InvalidEdge`]
/// if an edge fails validation.
pub fn load_network_csv(nodes_path: &Path, edges_path: &Path) -> NetworkResult<LoadedNetwork> {
    let nodes = std::fs::File::open(nodes_path)?;
    let edges = std::fs::File::open(edges_path)?;
    load_network_reader(nodes, edges)
}

/// Like [`load_network_csv`] but accepts any `Read` sources.
pub fn load_network_reader<N: Read, E: Read>(nodes: N, edges: E) -> NetworkResult<LoadedNetwork> {
    let mut builder = RoadNetworkBuilder::new();
    let mut node_index: HashMap<u64, NodeId> = HashMap::new();

    // ── Nodes ─────────────────────────────────────────────────────────────
    let mut rdr = csv::Reader::from_reader(nodes);
    for row in rdr.deserialize::<NodeRecord>() {
        let row = row?;
        if node_index.contains_key(&row.node_id) {
            return Err(NetworkError::Csv(format!("duplicate node id {}", row.node_id)));
        }
        let id = builder.add_node(GeoPoint::new(row.lat, row.lon));
        node_index.insert(row.node_id, id);
    }

    // ── Edges ─────────────────────────────────────────────────────────────
    let mut skipped = 0usize;
    let mut rdr = csv::Reader::from_reader(edges);
    for row in rdr.deserialize::<EdgeRecord>() {
        let row = row?;
        let Ok(class) = row.highway.parse::<RoadClass>() else {
            debug!("skipping {} -> {}: highway={} is not rideable", row.from, row.to, row.highway);
            skipped += 1;
            continue;
        };

        let from = lookup(&node_index, row.from)?;
        let to   = lookup(&node_index, row.to)?;
        let length_m = match row.length_m {
            Some(len) => len,
            None => {
                let derived = match (builder.node_pos(from), builder.node_pos(to)) {
                    (Some(a), Some(b)) => a.distance_m(b),
                    _ => 0.0,
                };
                if derived < MIN_DERIVED_LENGTH_M {
                    debug!(
                        "{} -> {}: derived length {derived:.2} m raised to {MIN_DERIVED_LENGTH_M} m",
                        row.from, row.to
                    );
                }
                derived.max(MIN_DERIVED_LENGTH_M)
            }
        };

        let mut spec = EdgeSpec::new(length_m, class);
        if let Some(score) = row.safety_score {
            spec = spec.with_safety_score(score);
        }

        if is_oneway(row.oneway.as_deref()) {
            builder.add_directed_edge(from, to, spec);
        } else {
            builder.add_road(from, to, spec);
        }
    }

    let network = builder.build()?;
    info!(
        "loaded road network: {} nodes, {} directed edges ({} rows skipped)",
        network.node_count(),
        network.edge_count(),
        skipped
    );
    Ok(LoadedNetwork { network, node_index })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn lookup(index: &HashMap<u64, NodeId>, external: u64) -> NetworkResult<NodeId> {
    index
        .get(&external)
        .copied()
        .ok_or_else(|| NetworkError::Csv(format!("edge references unknown node {external}")))
}

fn is_oneway(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("yes" | "true" | "1")
    )
}
