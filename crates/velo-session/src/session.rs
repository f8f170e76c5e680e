//! One rider's trip: the active plan, progress along it, and the triggers
//! that replace it.
//!
//! # Replan triggers
//!
//! | Trigger           | Checked by        | Condition                                  |
//! |-------------------|-------------------|--------------------------------------------|
//! | `Deviation`       | `update_position` | rider reported off the remaining plan      |
//! | `EdgeInvalidated` | `poll`            | an edge still ahead is closed in latest    |
//! | `MaxAge`          | `poll`            | plan older than `replan_interval_ms`       |
//! | `Recovery`        | both              | no active plan after an earlier failure    |
//!
//! The active plan lives in an [`ArcSwapOption`], so a [`PlanHandle`] on
//! another thread always reads either the previous plan or the new one.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use log::{debug, info, warn};

use velo_core::{Clock, Config, EdgeId, GeoPoint, NodeId, PlannerRng, SessionConfig, SystemClock};
use velo_network::{DijkstraRouter, RoadNetwork, Router, VersionTable};
use velo_planner::{CycleStats, PlanRequest, RolloutPlanner, RoutePlan};

use crate::index::PlanIndex;
use crate::{Position, ReplanTrigger, RouteOutput, SessionError, SessionResult, SessionStatus};

/// Read-only view of a session's active plan, cheap to clone and share.
#[derive(Clone)]
pub struct PlanHandle(Arc<ArcSwapOption<RoutePlan>>);

impl PlanHandle {
    pub fn load(&self) -> Option<Arc<RoutePlan>> {
        self.0.load_full()
    }
}

#[derive(Copy, Clone, Debug)]
struct Trip {
    destination: NodeId,
    /// Last node reached, or the head of the edge being ridden.
    current:     NodeId,
    /// Index of the next plan edge to ride.
    progress:    usize,
}

/// Route session manager for a single rider.
pub struct RouteSession<R: Router = DijkstraRouter, C: Clock = SystemClock> {
    planner: Arc<RolloutPlanner<R>>,
    table:   Arc<VersionTable>,
    clock:   C,
    rng:     PlannerRng,
    config:  SessionConfig,
    trip:    Option<Trip>,
    active:  Arc<ArcSwapOption<RoutePlan>>,
    index:   PlanIndex,
    stats:   CycleStats,
}

impl<R: Router, C: Clock> RouteSession<R, C> {
    /// The planner is shared; the RNG is seeded from `cfg.planner.seed`.
    pub fn new(
        planner: Arc<RolloutPlanner<R>>,
        table: Arc<VersionTable>,
        clock: C,
        cfg: &Config,
    ) -> Self {
        Self {
            planner,
            table,
            clock,
            rng: PlannerRng::new(cfg.planner.seed),
            config: cfg.session.clone(),
            trip: None,
            active: Arc::new(ArcSwapOption::empty()),
            index: PlanIndex::default(),
            stats: CycleStats::default(),
        }
    }

    // ── Trip lifecycle ────────────────────────────────────────────────────

    /// Begin a trip and compute its first plan.  Replaces any trip already
    /// in progress.
    pub fn start(&mut self, origin: NodeId, destination: NodeId) -> SessionResult<SessionStatus> {
        let latest = self.table.latest();
        for node in [origin, destination] {
            if !latest.network().contains_node(node) {
                return Err(SessionError::NodeNotFound(node));
            }
        }
        info!("session start {origin} -> {destination}");
        self.trip = Some(Trip { destination, current: origin, progress: 0 });
        self.replan(ReplanTrigger::Initial)
    }

    /// Report the rider's position.
    ///
    /// Advances along the plan when the position is on it, returns
    /// [`SessionStatus::Arrived`] at the destination and replans from the
    /// new position otherwise.  A rider part-way along an edge is replanned
    /// from the edge's head.
    pub fn update_position(&mut self, pos: Position) -> SessionResult<SessionStatus> {
        self.trip()?;
        let latest = self.table.latest();
        let net = latest.network();

        match pos {
            Position::AtNode(node) => {
                if !net.contains_node(node) {
                    return Err(SessionError::NodeNotFound(node));
                }
                self.reach_node(node)
            }
            Position::OnEdge(edge) => {
                if !net.contains_edge(edge) {
                    return Err(SessionError::EdgeNotFound(edge));
                }
                self.enter_edge(edge, net.edge_to[edge.index()])
            }
            Position::Geo(point) => match self.nearest_plan_node(net, point) {
                Some(node) => self.reach_node(node),
                None => {
                    let node = net.snap_to_node(point).ok_or(SessionError::NoNearbyNode(point))?;
                    debug!("position {point:?} is off the plan; snapped to {node}");
                    self.reach_node(node)
                }
            },
        }
    }

    /// Check the active plan against the latest graph version and the clock.
    pub fn poll(&mut self) -> SessionResult<SessionStatus> {
        let trip = self.trip()?;
        if trip.current == trip.destination {
            return Ok(SessionStatus::Arrived);
        }
        let Some(plan) = self.active.load_full() else {
            return self.replan(ReplanTrigger::Recovery);
        };

        let latest = self.table.latest();
        let ahead = plan.edges.get(trip.progress..).unwrap_or(&[]);
        if let Some(closed) = ahead.iter().find(|e| latest.is_closed(**e)) {
            info!(
                "edge {closed} ahead on plan (version {}) closed in version {}",
                plan.version,
                latest.version()
            );
            return self.replan(ReplanTrigger::EdgeInvalidated);
        }

        let age = self.clock.now().millis_since(plan.generated_at);
        if age > self.config.replan_interval_ms {
            debug!("plan is {age} ms old; refreshing");
            return self.replan(ReplanTrigger::MaxAge);
        }
        Ok(SessionStatus::OnPlan)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn active_plan(&self) -> Option<Arc<RoutePlan>> {
        self.active.load_full()
    }

    pub fn plan_handle(&self) -> PlanHandle {
        PlanHandle(Arc::clone(&self.active))
    }

    /// The active plan with node coordinates resolved, if there is one.
    pub fn route_output(&self) -> Option<RouteOutput> {
        let plan = self.active.load_full()?;
        Some(RouteOutput::from_plan(&plan, self.table.latest().network()))
    }

    /// Plan edges the rider has not started yet.
    pub fn remaining_edges(&self) -> Vec<EdgeId> {
        match (self.trip, self.active.load_full()) {
            (Some(trip), Some(plan)) => plan.edges.get(trip.progress..).unwrap_or(&[]).to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.trip.map(|t| t.current)
    }

    pub fn destination(&self) -> Option<NodeId> {
        self.trip.map(|t| t.destination)
    }

    /// Planner activity accumulated over the session.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn table(&self) -> &Arc<VersionTable> {
        &self.table
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn trip(&self) -> SessionResult<Trip> {
        self.trip.ok_or(SessionError::NotStarted)
    }

    fn set_trip(&mut self, trip: Trip) {
        self.trip = Some(trip);
    }

    fn reach_node(&mut self, node: NodeId) -> SessionResult<SessionStatus> {
        let mut trip = self.trip()?;
        trip.current = node;

        if node == trip.destination {
            trip.progress = self.index.edge_count();
            self.set_trip(trip);
            return Ok(SessionStatus::Arrived);
        }
        if self.active.load().is_some() {
            if let Some(pos) = self.index.position_from(node, trip.progress) {
                trip.progress = pos;
                self.set_trip(trip);
                return Ok(SessionStatus::OnPlan);
            }
        }

        self.set_trip(trip);
        let trigger = self.off_plan_trigger();
        self.replan(trigger)
    }

    fn enter_edge(&mut self, edge: EdgeId, head: NodeId) -> SessionResult<SessionStatus> {
        let mut trip = self.trip()?;
        trip.current = head;

        if let Some(plan) = self.active.load_full() {
            let ahead = plan.edges.get(trip.progress..).unwrap_or(&[]);
            if let Some(k) = ahead.iter().position(|e| *e == edge) {
                trip.progress += k + 1;
                self.set_trip(trip);
                return Ok(SessionStatus::OnPlan);
            }
        }

        self.set_trip(trip);
        let trigger = self.off_plan_trigger();
        self.replan(trigger)
    }

    fn off_plan_trigger(&self) -> ReplanTrigger {
        if self.active.load().is_some() {
            ReplanTrigger::Deviation
        } else {
            ReplanTrigger::Recovery
        }
    }

    /// Closest node still ahead on the plan, if within the off-route
    /// tolerance of `point`.
    fn nearest_plan_node(&self, net: &RoadNetwork, point: GeoPoint) -> Option<NodeId> {
        let trip = self.trip?;
        if self.active.load().is_none() {
            return None;
        }
        self.index
            .remaining(trip.progress)
            .iter()
            .map(|&n| (n, point.distance_m(net.node_pos[n.index()])))
            .filter(|&(_, d)| d <= self.config.off_route_tolerance_m)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(n, _)| n)
    }

    /// Plan from the current node and swap the result in.  On failure the
    /// active plan is cleared so a stale route is never served.
    fn replan(&mut self, trigger: ReplanTrigger) -> SessionResult<SessionStatus> {
        let mut trip = self.trip()?;
        let req = PlanRequest::new(trip.current, trip.destination, self.clock.now());

        match self.planner.plan(&req, &self.table, &mut self.rng, &mut self.stats) {
            Ok(plan) => {
                info!(
                    "replanned ({trigger}) {} -> {}: {} edges on version {}",
                    req.origin,
                    req.destination,
                    plan.edges.len(),
                    plan.version
                );
                self.index = PlanIndex::build(&plan, self.table.latest().network());
                self.active.store(Some(Arc::new(plan)));
                trip.progress = 0;
                self.set_trip(trip);
                if trip.current == trip.destination {
                    Ok(SessionStatus::Arrived)
                } else {
                    Ok(SessionStatus::Replanned(trigger))
                }
            }
            Err(e) => {
                warn!("replan ({trigger}) from {} failed: {e}; active plan cleared", req.origin);
                self.active.store(None);
                self.index = PlanIndex::default();
                Err(e.into())
            }
        }
    }
}
