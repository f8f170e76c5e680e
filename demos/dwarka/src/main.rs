//! dwarka — a rider crossing a synthetic Dwarka grid while closures and
//! traffic reports arrive.
//!
//! Usage: `dwarka [config.toml]`.  Set `RUST_LOG=debug` to see planning
//! cycles and event batches.
//!
//! Each step is one simulated minute: due events go through the feed into
//! the ingestor, the session polls the latest graph version, and the rider
//! rides one edge of the active plan.  The last plan is written to
//! `output/dwarka/route.csv`.

mod network;

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::warn;

use velo_core::{Clock, Config, EdgeId, ManualClock, NodeId, Timestamp};
use velo_events::{EventIngestor, channel, load_events_reader};
use velo_network::{DijkstraRouter, GraphVersion, LoadedNetwork, RoadNetwork, VersionTable};
use velo_planner::{PlanError, RolloutPlanner};
use velo_session::{Position, RouteOutput, RouteSession, SessionError, SessionStatus, write_route_csv};

// ── Constants ─────────────────────────────────────────────────────────────────

const START_MS:  u64   = 1_700_000_000_000;
const STEP_MS:   u64   = 60_000;
const MAX_STEPS: usize = 20;
const ORIGIN:    u64   = 1;
const DEST:      u64   = 9;

// ── Event script ──────────────────────────────────────────────────────────────

/// The event log as it would arrive from a city feed, keyed to this grid.
/// The traffic report with multiplier 0.5 is malformed and gets rejected.
fn event_log(loaded: &LoadedNetwork) -> Result<String> {
    let edge = |a: u64, b: u64| -> Result<EdgeId> {
        let (a, b) = (network::node(loaded, a)?, network::node(loaded, b)?);
        loaded
            .network
            .find_edge(a, b)
            .ok_or_else(|| anyhow::anyhow!("no edge {a} -> {b}"))
    };
    let at = |minute: u64| START_MS + minute * STEP_MS;

    let mut csv = String::from("kind,edge_id,value,timestamp_ms\n");
    csv += &format!("traffic_update,{},1.8,{}\n", edge(4, 7)?.0, at(1));
    csv += &format!("closure,{},,{}\n", edge(7, 8)?.0, at(2));
    csv += &format!("closure,{},,{}\n", edge(5, 8)?.0, at(2));
    csv += &format!("traffic_update,{},0.5,{}\n", edge(5, 6)?.0, at(3));
    csv += &format!("reopen,{},,{}\n", edge(7, 8)?.0, at(6));
    Ok(csv)
}

// ── Output ────────────────────────────────────────────────────────────────────

fn describe(network: &RoadNetwork, out: &RouteOutput) -> String {
    let hops: Vec<String> = out
        .edges
        .iter()
        .map(|e| format!("{}", network.edge_to[e.index()].0))
        .collect();
    format!(
        "v{:<3} cost {:>8.1}{}  via [{}]",
        out.version,
        out.total_cost,
        if out.approximate { " (approx)" } else { "" },
        hops.join(" ")
    )
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))?,
        None => Config::default(),
    };

    println!("=== dwarka — velo online bicycle routing ===");
    println!(
        "Rollouts: {}  |  Budget: {} ms  |  Policy: {:?}  |  Seed: {}",
        config.planner.rollout_count,
        config.planner.time_budget_ms,
        config.planner.aggregation_policy,
        config.planner.seed
    );
    println!();

    // 1. Network and graph versions.
    let loaded = network::load()?;
    let origin = network::node(&loaded, ORIGIN)?;
    let destination = network::node(&loaded, DEST)?;
    let mut events = load_events_reader(Cursor::new(event_log(&loaded)?))?;
    events.sort_by_key(|e| e.timestamp);

    let net = Arc::new(loaded.network);
    println!("Road network: {} nodes, {} edges", net.node_count(), net.edge_count());

    let clock = Arc::new(ManualClock::new(Timestamp(START_MS)));
    let table = Arc::new(VersionTable::new(GraphVersion::initial(Arc::clone(&net), clock.now())));

    // 2. Planner, ingestor, session.
    let planner = Arc::new(RolloutPlanner::new(&config, DijkstraRouter)?);
    let ingestor = EventIngestor::new(Arc::clone(&table), Arc::clone(&clock)).with_config(&config.ingest);
    let mut session = RouteSession::new(planner, Arc::clone(&table), Arc::clone(&clock), &config);
    let (sender, feed) = channel();

    // 3. Ride.
    let t0 = Instant::now();
    let mut status = session.start(origin, destination)?;
    let mut last_output = session.route_output();
    if let Some(out) = &last_output {
        println!("start   {:<22} {}", format!("{status:?}"), describe(&net, out));
    }

    let mut pending = events.into_iter().peekable();
    for step in 1..=MAX_STEPS {
        clock.advance(STEP_MS);
        let now = clock.now();

        while let Some(event) = pending.next_if(|e| e.timestamp <= now) {
            sender.send(event)?;
        }
        let batch = ingestor.drain(&feed)?;
        for (event, err) in &batch.rejected {
            println!("        rejected {event}: {err}");
        }

        status = match session.poll() {
            Ok(s) => s,
            Err(SessionError::Plan(PlanError::NoRouteFound { .. })) => {
                println!("step {step:>2} no safe route; waiting for the network to change");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if status == SessionStatus::Arrived {
            break;
        }

        // Ride the next plan edge.
        if let Some(&next) = session.remaining_edges().first() {
            let head: NodeId = net.edge_to[next.index()];
            session.update_position(Position::OnEdge(next))?;
            let arrived = session.update_position(Position::AtNode(head))?;
            if arrived == SessionStatus::Arrived {
                status = arrived;
            }
        }

        if let Some(out) = session.route_output() {
            println!(
                "step {step:>2} {:<22} at {:<3} {}",
                format!("{status:?}"),
                session.current_node().map_or(0, |n| n.0),
                describe(&net, &out)
            );
            last_output = Some(out);
        }
        if status == SessionStatus::Arrived {
            break;
        }
    }
    let elapsed = t0.elapsed();

    if status != SessionStatus::Arrived {
        warn!("rider did not arrive within {MAX_STEPS} steps");
    }

    // 4. Summary.
    let stats = session.stats();
    println!();
    println!("Ride finished in {:.3} s (wall clock)", elapsed.as_secs_f64());
    println!("  graph versions    : {}", table.version() + 1);
    println!("  planning cycles   : {}", stats.cycles);
    println!("  stale restarts    : {}", stats.stale_restarts);
    println!("  plans committed   : {} ({} approximate)", stats.plans, stats.approximate_plans);
    println!("  rollout samples   : {}/{}", stats.samples_completed, stats.samples_requested);

    if let Some(out) = &last_output {
        std::fs::create_dir_all("output/dwarka")?;
        let path = Path::new("output/dwarka/route.csv");
        write_route_csv(path, out)?;
        println!("  last plan         : {}", path.display());
    }

    Ok(())
}
