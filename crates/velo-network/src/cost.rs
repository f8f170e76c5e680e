//! Safety-aware edge cost.
//!
//! ```text
//! cost(e, v) = length(e) × traffic_multiplier(e, v) × penalty(class(e)) × score_factor(e)
//!            = ∞   if e is closed in v
//! score_factor(e) = 1 + safety_score_weight × (1 − safety_score(e))
//! ```
//!
//! With the default `safety_score_weight = 0` the score factor is 1.
//!
//! The function is total: unknown edges and NaN intermediate results yield
//! `∞`, and finite results are clamped away from zero so every traversal has
//! positive cost.

use velo_core::{Config, EdgeId, HighwayPolicy, RoadClass, SafetyWeights};

use crate::{GraphVersion, RoadNetwork};

/// Configured cost function.  Cheap to copy; holds no graph state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CostModel {
    weights:             SafetyWeights,
    safety_score_weight: f64,
    exclude_highways:    bool,
}

impl CostModel {
    pub fn new(weights: SafetyWeights, safety_score_weight: f64) -> Self {
        Self { weights, safety_score_weight, exclude_highways: false }
    }

    /// The primary cost model for `cfg`.  Under
    /// [`HighwayPolicy::AvoidWhenPossible`] this model excludes highways;
    /// use [`penalizing_highways`](Self::penalizing_highways) for the
    /// fallback search.
    pub fn from_config(cfg: &Config) -> Self {
        let model = Self::new(cfg.safety_weights, cfg.cost.safety_score_weight);
        match cfg.cost.highway_policy {
            HighwayPolicy::Penalize          => model,
            HighwayPolicy::AvoidWhenPossible => model.avoiding_highways(),
        }
    }

    /// Same model with highways treated as impassable.
    pub fn avoiding_highways(mut self) -> Self {
        self.exclude_highways = true;
        self
    }

    /// Same model with highways merely penalized.
    pub fn penalizing_highways(mut self) -> Self {
        self.exclude_highways = false;
        self
    }

    pub fn excludes_highways(&self) -> bool {
        self.exclude_highways
    }

    /// Cost of traversing `edge` with multiplier 1 and no closure.
    pub fn static_cost(&self, network: &RoadNetwork, edge: EdgeId) -> f64 {
        if !network.contains_edge(edge) {
            return f64::INFINITY;
        }
        let class = network.edge_class[edge.index()];
        if self.exclude_highways && class == RoadClass::Highway {
            return f64::INFINITY;
        }
        let length = network.edge_length_m[edge.index()] as f64;
        let score  = network.edge_safety[edge.index()] as f64;
        let factor = 1.0 + self.safety_score_weight * (1.0 - score);
        sanitize(length * self.weights.penalty(class) * factor)
    }

    /// Cost of traversing `edge` in `version`.  `∞` if closed.
    pub fn cost(&self, edge: EdgeId, version: &GraphVersion) -> f64 {
        match version.edge_state(edge) {
            None => f64::INFINITY,
            Some(s) if s.closed => f64::INFINITY,
            Some(s) => {
                sanitize(self.static_cost(version.network(), edge) * s.traffic_multiplier as f64)
            }
        }
    }

    /// Cost of every edge in `version`, indexed by `EdgeId`.
    ///
    /// Planning cycles call this once and share the slice across rollouts.
    pub fn costs(&self, version: &GraphVersion) -> Vec<f64> {
        (0..version.network().edge_count())
            .map(|i| self.cost(EdgeId(i as u32), version))
            .collect()
    }
}

#[inline]
fn sanitize(c: f64) -> f64 {
    if c.is_nan() {
        f64::INFINITY
    } else {
        c.max(f64::MIN_POSITIVE)
    }
}
