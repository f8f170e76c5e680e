//! Route output for clients, and a CSV writer for it.
//!
//! The CSV has one row per plan edge:
//!
//! ```text
//! seq,edge_id,from_lat,from_lon,to_lat,to_lon,version,approximate
//! 0,12,28.590000,77.040000,28.590900,77.040000,3,0
//! ```

use std::fs::File;
use std::io;
use std::path::Path;

use csv::Writer;

use velo_core::{EdgeId, GeoPoint};
use velo_network::RoadNetwork;
use velo_planner::RoutePlan;

use crate::SessionResult;

/// What a client needs to display and follow a plan.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteOutput {
    pub edges:       Vec<EdgeId>,
    /// Node positions along the route, origin first.  One more than
    /// `edges` unless the route is empty.
    pub coordinates: Vec<GeoPoint>,
    pub total_cost:  f64,
    pub approximate: bool,
    pub version:     u64,
}

impl RouteOutput {
    pub fn from_plan(plan: &RoutePlan, network: &RoadNetwork) -> Self {
        let coordinates = plan
            .nodes(network)
            .into_iter()
            .map(|n| network.node_pos[n.index()])
            .collect();
        Self {
            edges: plan.edges.clone(),
            coordinates,
            total_cost: plan.total_cost,
            approximate: plan.approximate,
            version: plan.version,
        }
    }
}

/// Write `output` to a CSV file at `path`, replacing any existing file.
pub fn write_route_csv(path: &Path, output: &RouteOutput) -> SessionResult<()> {
    write_route_writer(File::create(path)?, output)
}

/// Write `output` as CSV to any writer.  The header row is always written.
pub fn write_route_writer<W: io::Write>(writer: W, output: &RouteOutput) -> SessionResult<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["seq", "edge_id", "from_lat", "from_lon", "to_lat", "to_lon", "version", "approximate"])?;

    for (seq, (edge, leg)) in output.edges.iter().zip(output.coordinates.windows(2)).enumerate() {
        wtr.write_record(&[
            seq.to_string(),
            edge.0.to_string(),
            format!("{:.6}", leg[0].lat),
            format!("{:.6}", leg[0].lon),
            format!("{:.6}", leg[1].lat),
            format!("{:.6}", leg[1].lon),
            output.version.to_string(),
            (output.approximate as u8).to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
