//! Planner observer trait for diagnostics and test instrumentation.

use crate::RoutePlan;

/// Callbacks invoked by [`RolloutPlanner::plan`](crate::RolloutPlanner::plan)
/// at key points of a planning call.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
pub trait PlannerObserver {
    /// A cycle is starting against graph version `version`.  `restart` is 0
    /// for the first cycle of a call and counts stale restarts after that.
    fn on_cycle_start(&mut self, _version: u64, _restart: u32) {}

    /// The rollout batch finished (or hit the deadline).
    fn on_samples_complete(&mut self, _completed: usize, _requested: usize) {}

    /// A plan computed against `stale_version` had an edge closed in
    /// `latest_version` and was discarded.
    fn on_stale_restart(&mut self, _stale_version: u64, _latest_version: u64) {}

    /// A plan is about to be returned to the caller.
    fn on_plan(&mut self, _plan: &RoutePlan) {}
}

/// A [`PlannerObserver`] that does nothing.
pub struct NoopObserver;

impl PlannerObserver for NoopObserver {}

/// Counts what happened across one or more planning calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleStats {
    pub cycles:            usize,
    pub stale_restarts:    usize,
    pub samples_completed: usize,
    pub samples_requested: usize,
    pub plans:             usize,
    pub approximate_plans: usize,
    /// Version of the most recent plan.
    pub last_version:      Option<u64>,
}

impl PlannerObserver for CycleStats {
    fn on_cycle_start(&mut self, _version: u64, _restart: u32) {
        self.cycles += 1;
    }

    fn on_samples_complete(&mut self, completed: usize, requested: usize) {
        self.samples_completed += completed;
        self.samples_requested += requested;
    }

    fn on_stale_restart(&mut self, _stale_version: u64, _latest_version: u64) {
        self.stale_restarts += 1;
    }

    fn on_plan(&mut self, plan: &RoutePlan) {
        self.plans += 1;
        if plan.approximate {
            self.approximate_plans += 1;
        }
        self.last_version = Some(plan.version);
    }
}
