//! The online rollout planner.
//!
//! # Planning call
//!
//! [`RolloutPlanner::plan`] runs one or more *cycles* within a single
//! wall-clock budget:
//!
//! 1. Capture the latest [`GraphVersion`].
//! 2. Baseline: unperturbed least-cost route.  No route is fatal.
//! 3. Candidates: the open out-edges of the origin.
//! 4. Rollouts: `rollout_count` perturbed samples, seeded sequentially from
//!    the caller's [`PlannerRng`], evaluated in parallel.
//! 5. Aggregate per candidate and pick the minimum (ties go to the baseline's
//!    first edge, then to the lower `EdgeId`).
//! 6. Plan = chosen edge + unperturbed tail, or the baseline if the tail
//!    would loop back through the origin or nothing scored finite.
//! 7. Commit check against the *latest* version.  If a plan edge has been
//!    closed meanwhile, discard and restart on the latest version.
//!
//! # Anytime behaviour
//!
//! Samples still pending at the deadline are dropped.  A plan built from
//! fewer samples than requested is flagged `approximate`; with no samples
//! at all the baseline route is returned, also flagged.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use velo_core::{Config, EdgeId, NodeId, PerturbationConfig, PlannerConfig, PlannerRng};
use velo_network::{
    CostModel, DijkstraRouter, GraphVersion, NetworkError, RoadNetwork, Route, Router,
    SearchDeadline, VersionTable,
};

use crate::{
    Aggregator, PlanError, PlanRequest, PlanResult, PlannerObserver, RolloutBatch, RolloutSample,
    RoutePlan,
};

/// Time-bounded, rollout-driven route planner.
///
/// Holds no graph state; every call reads the version table it is given.
/// Safe to share across sessions.
pub struct RolloutPlanner<R: Router = DijkstraRouter> {
    config:       PlannerConfig,
    perturbation: PerturbationConfig,
    model:        CostModel,
    aggregator:   Aggregator,
    router:       R,
    #[cfg(feature = "parallel")]
    pool:         Option<rayon::ThreadPool>,
}

impl<R: Router> RolloutPlanner<R> {
    /// Build a planner from a validated configuration.
    ///
    /// With the `parallel` feature and `planner.num_threads` set, rollouts
    /// run on a dedicated pool of that size; otherwise on rayon's global pool.
    pub fn new(cfg: &Config, router: R) -> PlanResult<Self> {
        #[cfg(feature = "parallel")]
        let pool = match cfg.planner.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("velo-rollout-{i}"))
                    .build()
                    .map_err(|e| PlanError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };
        #[cfg(not(feature = "parallel"))]
        if cfg.planner.num_threads.is_some() {
            debug!("planner.num_threads ignored: built without the `parallel` feature");
        }

        Ok(Self {
            config:       cfg.planner.clone(),
            perturbation: cfg.perturbation.clone(),
            model:        CostModel::from_config(cfg),
            aggregator:   Aggregator::new(cfg.planner.aggregation_policy, cfg.planner.risk_aversion),
            router,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Produce a plan for `req` against the latest version in `table`.
    ///
    /// Stale reads are retried internally and never surface.
    ///
    /// # Budget
    ///
    /// Rollouts and the tail search after the chosen first edge stop at
    /// `time_budget_ms`.  The baseline search of each cycle is never
    /// interrupted, since without it there is no plan to return, so a call
    /// can overrun the budget by one baseline search per cycle.  A restart
    /// that begins after the deadline costs one more baseline search.
    ///
    /// # Errors
    ///
    /// [`PlanError::NoRouteFound`] if origin and destination are
    /// disconnected in the version being planned against, and
    /// [`PlanError::NodeNotFound`] for nodes outside the network.
    pub fn plan<O: PlannerObserver>(
        &self,
        req: &PlanRequest,
        table: &VersionTable,
        rng: &mut PlannerRng,
        observer: &mut O,
    ) -> PlanResult<RoutePlan> {
        let deadline = SearchDeadline::at(Instant::now() + Duration::from_millis(self.config.time_budget_ms));
        let mut version = table.latest();
        let mut restart = 0u32;

        loop {
            observer.on_cycle_start(version.version(), restart);
            let seeds = rng.sample_seeds(self.config.rollout_count);
            let plan = self.run_cycle(req, &version, &seeds, deadline, observer)?;

            let latest = table.latest();
            let closed = plan.closed_edges_in(&latest);
            if closed.is_empty() {
                return Ok(self.commit(plan, observer));
            }

            warn!(
                "plan on version {} crosses {} edge(s) closed in version {}; restarting",
                version.version(),
                closed.len(),
                latest.version()
            );
            observer.on_stale_restart(version.version(), latest.version());
            restart += 1;
            version = latest;

            if restart > self.config.max_restarts || deadline.expired() {
                let route = self.baseline(&version, req.origin, req.destination)?.0;
                let mut plan = route_plan(req, &version, route, 0, 0);
                plan.approximate = true;
                return Ok(self.commit(plan, observer));
            }
        }
    }

    /// Unperturbed least-cost route in `version`, honouring the highway
    /// policy.  Also returns the edge costs the route was found under.
    pub fn baseline(
        &self,
        version: &GraphVersion,
        from: NodeId,
        to: NodeId,
    ) -> PlanResult<(Route, Vec<f64>)> {
        let net = version.network();
        let costs = self.model.costs(version);
        match self.router.shortest_path(net, &costs, from, to, SearchDeadline::none()) {
            Ok(route) => Ok((route, costs)),
            Err(NetworkError::NoRoute { .. }) if self.model.excludes_highways() => {
                debug!("no highway-free route {from} -> {to}; retrying with highways penalized");
                let costs = self.model.penalizing_highways().costs(version);
                self.router
                    .shortest_path(net, &costs, from, to, SearchDeadline::none())
                    .map(|route| (route, costs))
                    .map_err(route_error)
            }
            Err(e) => Err(route_error(e)),
        }
    }

    // ── Cycle ─────────────────────────────────────────────────────────────

    fn run_cycle<O: PlannerObserver>(
        &self,
        req: &PlanRequest,
        version: &GraphVersion,
        seeds: &[u64],
        deadline: SearchDeadline,
        observer: &mut O,
    ) -> PlanResult<RoutePlan> {
        let net = version.network();
        let (baseline, base_costs) = self.baseline(version, req.origin, req.destination)?;
        if baseline.is_trivial() {
            return Ok(route_plan(req, version, baseline, 0, 0));
        }

        let candidates: Vec<EdgeId> = net
            .out_edges(req.origin)
            .filter(|e| base_costs[e.index()].is_finite())
            .collect();
        let uncertain = self.uncertain_edges(net, &base_costs, req.origin);

        let batch = RolloutBatch {
            router:       &self.router,
            network:      net,
            base_costs:   &base_costs,
            uncertain:    &uncertain,
            candidates:   &candidates,
            destination:  req.destination,
            perturbation: &self.perturbation,
            deadline,
        };
        let samples = self.run_batch(&batch, seeds);
        let (completed, requested) = (samples.len(), seeds.len());
        observer.on_samples_complete(completed, requested);
        debug!(
            "cycle on version {}: {} candidates, {} uncertain edges, {}/{} samples",
            version.version(),
            candidates.len(),
            uncertain.len(),
            completed,
            requested
        );

        if completed == 0 {
            let mut plan = route_plan(req, version, baseline, 0, requested);
            plan.approximate = true;
            return Ok(plan);
        }

        let scores = self.score_candidates(candidates.len(), &samples);
        let baseline_first = baseline.edges.first().copied();
        let Some(best) = select_candidate(&candidates, &scores, baseline_first) else {
            debug!("no candidate scored finite; using baseline route");
            return Ok(route_plan(req, version, baseline, completed, requested));
        };

        let chosen = candidates[best];
        let route = if Some(chosen) == baseline_first {
            baseline
        } else {
            match self.route_via(net, &base_costs, req, chosen, deadline) {
                Some(route) => route,
                None => {
                    debug!("no usable tail after {chosen}; using baseline route");
                    baseline
                }
            }
        };

        let mut plan = route_plan(req, version, route, completed, requested);
        plan.expected_cost = scores[best];
        Ok(plan)
    }

    /// `chosen` followed by the unperturbed least-cost tail from its head.
    /// `None` if the tail is missing, was cut off by `deadline` or revisits
    /// the origin.
    fn route_via(
        &self,
        net: &RoadNetwork,
        costs: &[f64],
        req: &PlanRequest,
        chosen: EdgeId,
        deadline: SearchDeadline,
    ) -> Option<Route> {
        let head = net.edge_to[chosen.index()];
        if head == req.origin {
            return None;
        }
        let tail = self
            .router
            .shortest_path(net, costs, head, req.destination, deadline)
            .ok()?;
        if tail.nodes(net).contains(&req.origin) {
            return None;
        }
        let mut edges = Vec::with_capacity(tail.edges.len() + 1);
        edges.push(chosen);
        edges.extend(tail.edges);
        Some(Route { edges, total_cost: costs[chosen.index()] + tail.total_cost })
    }

    /// Open edges leaving any node within the perturbation radius of `origin`.
    fn uncertain_edges(&self, net: &RoadNetwork, costs: &[f64], origin: NodeId) -> Vec<EdgeId> {
        let pos = net.node_pos[origin.index()];
        net.nodes_within(pos, self.perturbation.radius_m)
            .into_iter()
            .flat_map(|n| net.out_edges(n))
            .filter(|e| costs[e.index()].is_finite())
            .collect()
    }

    fn score_candidates(&self, count: usize, samples: &[RolloutSample]) -> Vec<f64> {
        let mut column = Vec::with_capacity(samples.len());
        (0..count)
            .map(|i| {
                column.clear();
                column.extend(samples.iter().map(|s| s.candidate_costs[i]));
                self.aggregator.aggregate(&column)
            })
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn run_batch(&self, batch: &RolloutBatch<'_, R>, seeds: &[u64]) -> Vec<RolloutSample> {
        match &self.pool {
            Some(pool) => pool.install(|| batch.run(seeds)),
            None => batch.run(seeds),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_batch(&self, batch: &RolloutBatch<'_, R>, seeds: &[u64]) -> Vec<RolloutSample> {
        batch.run(seeds)
    }

    fn commit<O: PlannerObserver>(&self, plan: RoutePlan, observer: &mut O) -> RoutePlan {
        if plan.approximate {
            warn!(
                "approximate plan on version {}: {}/{} samples completed",
                plan.version, plan.samples_completed, plan.samples_requested
            );
        }
        info!(
            "plan {} -> {} on version {}: {} edges, cost {:.1} (expected {:.1})",
            plan.origin,
            plan.destination,
            plan.version,
            plan.edges.len(),
            plan.total_cost,
            plan.expected_cost
        );
        observer.on_plan(&plan);
        plan
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Index of the candidate with the lowest finite score.  Ties go to
/// `preferred`, then to the earlier candidate.
pub(crate) fn select_candidate(
    candidates: &[EdgeId],
    scores: &[f64],
    preferred: Option<EdgeId>,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            continue;
        }
        best = match best {
            None => Some(i),
            Some(b) if score < scores[b] => Some(i),
            Some(b) if score == scores[b] && Some(candidates[i]) == preferred => Some(i),
            keep => keep,
        };
    }
    best
}

fn route_plan(
    req: &PlanRequest,
    version: &GraphVersion,
    route: Route,
    completed: usize,
    requested: usize,
) -> RoutePlan {
    RoutePlan {
        origin:            req.origin,
        destination:       req.destination,
        edges:             route.edges,
        total_cost:        route.total_cost,
        expected_cost:     route.total_cost,
        version:           version.version(),
        generated_at:      req.now,
        approximate:       completed < requested,
        samples_completed: completed,
        samples_requested: requested,
    }
}

fn route_error(e: NetworkError) -> PlanError {
    match e {
        NetworkError::NoRoute { from, to } => PlanError::NoRouteFound { from, to },
        NetworkError::NodeNotFound(n) => PlanError::NodeNotFound(n),
        other => PlanError::Network(other),
    }
}
