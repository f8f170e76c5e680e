//! Synthetic Dwarka road network.
//!
//! A 3 × 3 grid of sector corners in Dwarka, New Delhi, with the sector
//! roads as internal streets, one arterial crossing the middle, service lanes
//! along the north edge and a trunk-road shortcut cutting across.  External
//! node ids follow the grid:
//!
//! ```text
//!   7 ── 8 ── 9      north: service lanes
//!   │    │    │
//!   4 ══ 5 ══ 6      middle: arterial
//!   │    │    │
//!   1 ── 2 ── 3      south: residential
//! ```
//!
//! Node 1 to node 9 is also joined by a trunk road.

use std::io::Cursor;

use anyhow::{Result, anyhow};

use velo_core::NodeId;
use velo_network::{LoadedNetwork, load_network_reader};

const NODES_CSV: &str = "\
node_id,lat,lon\n\
1,28.5800,77.0400\n\
2,28.5800,77.0500\n\
3,28.5800,77.0600\n\
4,28.5880,77.0400\n\
5,28.5880,77.0500\n\
6,28.5880,77.0600\n\
7,28.5960,77.0400\n\
8,28.5960,77.0500\n\
9,28.5960,77.0600\n\
";

// Empty lengths are filled in from the node coordinates.  The footbridge
// row is `steps` and is skipped by the loader.
const EDGES_CSV: &str = "\
from,to,length_m,highway,safety_score,oneway\n\
1,2,,residential,,no\n\
2,3,,residential,,no\n\
4,5,,secondary,0.5,no\n\
5,6,,secondary,0.5,no\n\
7,8,,service,,no\n\
8,9,,living_street,0.9,no\n\
1,4,,residential,,no\n\
4,7,,residential,,no\n\
2,5,,residential,,no\n\
5,8,,residential,,no\n\
3,6,,residential,,no\n\
6,9,,residential,,no\n\
1,9,2100,trunk,0.2,no\n\
2,4,,steps,,no\n\
";

/// Load the grid.
pub fn load() -> Result<LoadedNetwork> {
    Ok(load_network_reader(Cursor::new(NODES_CSV), Cursor::new(EDGES_CSV))?)
}

/// Resolve an external node id from the CSV to its `NodeId`.
pub fn node(loaded: &LoadedNetwork, external: u64) -> Result<NodeId> {
    loaded
        .node_index
        .get(&external)
        .copied()
        .ok_or_else(|| anyhow!("node {external} missing from the Dwarka grid"))
}
