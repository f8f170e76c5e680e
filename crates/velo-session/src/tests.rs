//! Unit tests for velo-session.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use velo_core::{Config, GeoPoint, ManualClock, NodeId, RoadClass, Timestamp};
    use velo_events::EventIngestor;
    use velo_network::{DijkstraRouter, EdgeSpec, GraphVersion, RoadNetworkBuilder, VersionTable};
    use velo_planner::RolloutPlanner;

    use crate::RouteSession;

    pub type TestSession = RouteSession<DijkstraRouter, Arc<ManualClock>>;

    pub struct Fixture {
        pub nodes:    [NodeId; 5],
        pub table:    Arc<VersionTable>,
        pub clock:    Arc<ManualClock>,
        pub ingestor: EventIngestor<Arc<ManualClock>>,
        pub session:  TestSession,
    }

    pub fn config() -> Config {
        let mut cfg = Config::default();
        cfg.planner.rollout_count = 8;
        cfg.planner.time_budget_ms = 30_000;
        cfg.perturbation.micro_closure_prob = 0.0;
        cfg.perturbation.congestion_prob = 0.0;
        cfg
    }

    /// Five nodes, internal two-way roads:
    ///
    /// ```text
    ///   A ─100─ B ─100─ C ─100─ E
    ///    \                     /
    ///     ──200── D ──200──────
    /// ```
    pub fn fixture() -> Fixture {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(GeoPoint::new(28.5900, 77.0400));
        let n_b = b.add_node(GeoPoint::new(28.5909, 77.0400));
        let c = b.add_node(GeoPoint::new(28.5918, 77.0400));
        let d = b.add_node(GeoPoint::new(28.5913, 77.0415));
        let e = b.add_node(GeoPoint::new(28.5927, 77.0400));
        let spec = |len| EdgeSpec::new(len, RoadClass::Internal);
        b.add_road(a, n_b, spec(100.0));
        b.add_road(n_b, c, spec(100.0));
        b.add_road(c, e, spec(100.0));
        b.add_road(a, d, spec(200.0));
        b.add_road(d, e, spec(200.0));
        let net = Arc::new(b.build().unwrap());

        let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
        let table = Arc::new(VersionTable::new(GraphVersion::initial(net, Timestamp(0))));
        let cfg = config();
        let planner = Arc::new(RolloutPlanner::new(&cfg, DijkstraRouter).unwrap());
        let session = RouteSession::new(planner, Arc::clone(&table), Arc::clone(&clock), &cfg);
        let ingestor = EventIngestor::new(Arc::clone(&table), Arc::clone(&clock));
        Fixture { nodes: [a, n_b, c, d, e], table, clock, ingestor, session }
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use velo_core::{EdgeId, NodeId};

    use crate::{Position, ReplanTrigger, SessionError, SessionStatus};

    #[test_log::test]
    fn start_produces_safe_plan() {
        let mut f = super::helpers::fixture();
        let [a, b, c, _d, e] = f.nodes;
        let status = f.session.start(a, e).unwrap();
        assert_eq!(status, SessionStatus::Replanned(ReplanTrigger::Initial));

        let plan = f.session.active_plan().unwrap();
        let latest = f.table.latest();
        assert_eq!(plan.nodes(latest.network()), vec![a, b, c, e]);
        assert!(plan.is_open_in(&latest));
        assert_eq!(f.session.remaining_edges(), plan.edges);
        assert_eq!(f.session.stats().plans, 1);
    }

    #[test]
    fn start_at_destination_is_arrived() {
        let mut f = super::helpers::fixture();
        let a = f.nodes[0];
        assert_eq!(f.session.start(a, a).unwrap(), SessionStatus::Arrived);
        assert!(f.session.active_plan().unwrap().is_trivial());
    }

    #[test]
    fn unknown_nodes_rejected() {
        let mut f = super::helpers::fixture();
        let err = f.session.start(f.nodes[0], NodeId(42)).unwrap_err();
        assert!(matches!(err, SessionError::NodeNotFound(NodeId(42))));
        assert!(f.session.active_plan().is_none());
    }

    #[test]
    fn calls_before_start_fail() {
        let mut f = super::helpers::fixture();
        assert!(matches!(f.session.poll(), Err(SessionError::NotStarted)));
        assert!(matches!(
            f.session.update_position(Position::AtNode(f.nodes[1])),
            Err(SessionError::NotStarted)
        ));
        assert!(f.session.route_output().is_none());
    }

    #[test]
    fn unknown_edge_position_rejected() {
        let mut f = super::helpers::fixture();
        f.session.start(f.nodes[0], f.nodes[4]).unwrap();
        let err = f.session.update_position(Position::OnEdge(EdgeId(500))).unwrap_err();
        assert!(matches!(err, SessionError::EdgeNotFound(EdgeId(500))));
    }
}

// ── Position tracking ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tracking {
    use velo_core::GeoPoint;

    use crate::{Position, ReplanTrigger, SessionStatus};

    #[test]
    fn following_the_plan_to_arrival() {
        let mut f = super::helpers::fixture();
        let [a, b, c, _d, e] = f.nodes;
        let net = f.table.latest().network_arc().clone();
        f.session.start(a, e).unwrap();

        let ab = net.find_edge(a, b).unwrap();
        assert_eq!(f.session.update_position(Position::OnEdge(ab)).unwrap(), SessionStatus::OnPlan);
        assert_eq!(f.session.current_node(), Some(b));
        assert_eq!(f.session.update_position(Position::AtNode(b)).unwrap(), SessionStatus::OnPlan);
        assert_eq!(f.session.update_position(Position::AtNode(c)).unwrap(), SessionStatus::OnPlan);
        assert_eq!(f.session.remaining_edges(), vec![net.find_edge(c, e).unwrap()]);
        assert_eq!(f.session.update_position(Position::AtNode(e)).unwrap(), SessionStatus::Arrived);
        assert_eq!(f.session.poll().unwrap(), SessionStatus::Arrived);
        assert_eq!(f.session.stats().plans, 1);
    }

    #[test]
    fn leaving_the_plan_replans_from_new_node() {
        let mut f = super::helpers::fixture();
        let [a, _b, _c, d, e] = f.nodes;
        f.session.start(a, e).unwrap();

        let status = f.session.update_position(Position::AtNode(d)).unwrap();
        assert_eq!(status, SessionStatus::Replanned(ReplanTrigger::Deviation));
        let plan = f.session.active_plan().unwrap();
        assert_eq!(plan.origin, d);
        assert_eq!(plan.nodes(f.table.latest().network()), vec![d, e]);
    }

    #[test]
    fn wrong_edge_replans_from_its_head() {
        let mut f = super::helpers::fixture();
        let [a, _b, _c, d, e] = f.nodes;
        let ad = f.table.latest().network().find_edge(a, d).unwrap();
        f.session.start(a, e).unwrap();

        let status = f.session.update_position(Position::OnEdge(ad)).unwrap();
        assert_eq!(status, SessionStatus::Replanned(ReplanTrigger::Deviation));
        assert_eq!(f.session.current_node(), Some(d));
        assert_eq!(f.session.active_plan().unwrap().origin, d);
    }

    #[test]
    fn geo_positions_near_plan_stay_on_plan() {
        let mut f = super::helpers::fixture();
        let [a, _b, c, d, e] = f.nodes;
        f.session.start(a, e).unwrap();

        // ~10 m from C.
        let near_c = GeoPoint::new(28.59189, 77.04001);
        assert_eq!(f.session.update_position(Position::Geo(near_c)).unwrap(), SessionStatus::OnPlan);
        assert_eq!(f.session.current_node(), Some(c));

        let at_d = GeoPoint::new(28.5913, 77.0415);
        let status = f.session.update_position(Position::Geo(at_d)).unwrap();
        assert_eq!(status, SessionStatus::Replanned(ReplanTrigger::Deviation));
        assert_eq!(f.session.current_node(), Some(d));
    }

    #[test]
    fn route_output_resolves_coordinates() {
        let mut f = super::helpers::fixture();
        let [a, .., e] = f.nodes;
        f.session.start(a, e).unwrap();

        let out = f.session.route_output().unwrap();
        assert_eq!(out.edges.len(), 3);
        assert_eq!(out.coordinates.len(), 4);
        assert_eq!(out.coordinates[0], GeoPoint::new(28.5900, 77.0400));
        assert_eq!(out.coordinates[3], GeoPoint::new(28.5927, 77.0400));
        assert_eq!(out.total_cost, 300.0);
        assert_eq!(out.version, 0);
        assert!(!out.approximate);
    }
}

// ── Replan triggers ───────────────────────────────────────────────────────────

#[cfg(test)]
mod triggers {
    use velo_core::Timestamp;
    use velo_events::UpdateEvent;
    use velo_planner::PlanError;

    use crate::{Position, ReplanTrigger, SessionError, SessionStatus};

    #[test_log::test]
    fn closure_ahead_invalidates_plan() {
        let mut f = super::helpers::fixture();
        let [a, b, c, d, e] = f.nodes;
        let bc = f.table.latest().network().find_edge(b, c).unwrap();
        f.session.start(a, e).unwrap();
        assert!(f.session.active_plan().unwrap().contains_edge(bc));
        assert_eq!(f.session.poll().unwrap(), SessionStatus::OnPlan);

        f.ingestor.apply(UpdateEvent::closure(bc, Timestamp(2_000))).unwrap();
        assert_eq!(f.session.poll().unwrap(), SessionStatus::Replanned(ReplanTrigger::EdgeInvalidated));

        let plan = f.session.active_plan().unwrap();
        let latest = f.table.latest();
        assert!(!plan.contains_edge(bc));
        assert!(plan.is_open_in(&latest));
        assert_eq!(plan.version, latest.version());
        assert_eq!(plan.nodes(latest.network()), vec![a, d, e]);
        assert_eq!(f.session.poll().unwrap(), SessionStatus::OnPlan);
    }

    #[test]
    fn closure_behind_rider_is_ignored() {
        let mut f = super::helpers::fixture();
        let [a, b, .., e] = f.nodes;
        let ab = f.table.latest().network().find_edge(a, b).unwrap();
        f.session.start(a, e).unwrap();
        f.session.update_position(Position::AtNode(b)).unwrap();

        f.ingestor.apply(UpdateEvent::closure(ab, Timestamp(2_000))).unwrap();
        assert_eq!(f.session.poll().unwrap(), SessionStatus::OnPlan);
        assert_eq!(f.session.active_plan().unwrap().version, 0);
    }

    #[test]
    fn replan_mid_trip_starts_at_rider() {
        let mut f = super::helpers::fixture();
        let [a, b, c, .., e] = f.nodes;
        let bc = f.table.latest().network().find_edge(b, c).unwrap();
        f.session.start(a, e).unwrap();
        f.session.update_position(Position::AtNode(b)).unwrap();

        f.ingestor.apply(UpdateEvent::closure(bc, Timestamp(2_000))).unwrap();
        assert_eq!(f.session.poll().unwrap(), SessionStatus::Replanned(ReplanTrigger::EdgeInvalidated));
        let plan = f.session.active_plan().unwrap();
        assert_eq!(plan.origin, b);
        assert!(!plan.contains_edge(bc));
        assert!(plan.is_connected(f.table.latest().network()));
    }

    #[test]
    fn old_plans_are_refreshed() {
        let mut f = super::helpers::fixture();
        let [a, .., e] = f.nodes;
        f.session.start(a, e).unwrap();

        f.clock.advance(120_000);
        assert_eq!(f.session.poll().unwrap(), SessionStatus::OnPlan);
        f.clock.advance(1);
        assert_eq!(f.session.poll().unwrap(), SessionStatus::Replanned(ReplanTrigger::MaxAge));
        assert_eq!(f.session.active_plan().unwrap().generated_at, Timestamp(121_001));
        assert_eq!(f.session.poll().unwrap(), SessionStatus::OnPlan);
    }

    #[test_log::test]
    fn no_route_clears_plan_until_recovery() {
        let mut f = super::helpers::fixture();
        let [a, b, _c, d, e] = f.nodes;
        let net = f.table.latest().network_arc().clone();
        let ab = net.find_edge(a, b).unwrap();
        let ad = net.find_edge(a, d).unwrap();
        f.session.start(a, e).unwrap();

        f.ingestor
            .apply_batch([UpdateEvent::closure(ab, Timestamp(2_000)), UpdateEvent::closure(ad, Timestamp(2_000))])
            .unwrap();
        let err = f.session.poll().unwrap_err();
        assert!(matches!(err, SessionError::Plan(PlanError::NoRouteFound { .. })));
        assert!(f.session.active_plan().is_none());
        assert!(f.session.route_output().is_none());

        f.ingestor.apply(UpdateEvent::reopen(ab, Timestamp(3_000))).unwrap();
        assert_eq!(f.session.poll().unwrap(), SessionStatus::Replanned(ReplanTrigger::Recovery));
        assert!(f.session.active_plan().unwrap().contains_edge(ab));
    }

    #[test]
    fn handle_readers_see_whole_plans() {
        let mut f = super::helpers::fixture();
        let [a, b, c, .., e] = f.nodes;
        let net = f.table.latest().network_arc().clone();
        let bc = net.find_edge(b, c).unwrap();
        let handle = f.session.plan_handle();
        assert!(handle.load().is_none());
        f.session.start(a, e).unwrap();

        std::thread::scope(|s| {
            let reader = s.spawn(|| {
                for _ in 0..1_000 {
                    let plan = handle.load().unwrap();
                    assert!(plan.is_connected(&net));
                }
            });
            f.ingestor.apply(UpdateEvent::closure(bc, Timestamp(2_000))).unwrap();
            f.session.poll().unwrap();
            reader.join().unwrap();
        });

        assert_eq!(handle.load().unwrap().version, 1);
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod output {
    use velo_core::{EdgeId, GeoPoint};

    use crate::{RouteOutput, write_route_csv, write_route_writer};

    fn sample() -> RouteOutput {
        RouteOutput {
            edges:       vec![EdgeId(0), EdgeId(2)],
            coordinates: vec![
                GeoPoint::new(28.59, 77.04),
                GeoPoint::new(28.6, 77.04),
                GeoPoint::new(28.6, 77.05),
            ],
            total_cost:  300.0,
            approximate: true,
            version:     7,
        }
    }

    #[test]
    fn one_row_per_edge() {
        let mut buf = Vec::new();
        write_route_writer(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "seq,edge_id,from_lat,from_lon,to_lat,to_lon,version,approximate");
        assert!(lines[1].starts_with("0,0,28.59"));
        assert!(lines[2].starts_with("1,2,28.6"));
        assert!(lines[2].ends_with(",7,1"));
    }

    #[test]
    fn empty_route_writes_header_only() {
        let out = RouteOutput {
            edges:       vec![],
            coordinates: vec![GeoPoint::new(28.59, 77.04)],
            total_cost:  0.0,
            approximate: false,
            version:     0,
        };
        let mut buf = Vec::new();
        write_route_writer(&mut buf, &out).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }

    #[test]
    fn writes_to_file() {
        let path = std::env::temp_dir().join(format!("velo-route-{}.csv", std::process::id()));
        write_route_csv(&path, &sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(text.lines().count(), 3);
    }
}
