//! Engine configuration.
//!
//! Loaded from a TOML file by the application crate and passed to the
//! planner, ingestor and session.  Every field has a default, so an empty
//! file is a valid configuration:
//!
//! ```toml
//! [planner]
//! rollout_count      = 64
//! time_budget_ms     = 200
//! aggregation_policy = "risk_adjusted"
//! risk_aversion      = 0.5
//!
//! [safety_weights]
//! service  = 0.5
//! internal = 1.0
//! arterial = 2.5
//! highway  = 25.0
//!
//! [cost]
//! highway_policy = "avoid_when_possible"
//!
//! [perturbation]
//! radius_m           = 1500.0
//! micro_closure_prob = 0.01
//!
//! [session]
//! replan_interval_ms = 60000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, RoadClass};

// ── Top level ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub planner:        PlannerConfig,
    pub safety_weights: SafetyWeights,
    pub cost:           CostConfig,
    pub perturbation:   PerturbationConfig,
    pub session:        SessionConfig,
    pub ingest:         IngestConfig,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> CoreResult<Config> {
        let cfg: Config = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> CoreResult<Config> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject configurations the engine cannot honour.
    pub fn validate(&self) -> CoreResult<()> {
        let p = &self.planner;
        if p.rollout_count == 0 {
            return Err(CoreError::Config("planner.rollout_count must be > 0".into()));
        }
        if !(p.risk_aversion.is_finite() && p.risk_aversion >= 0.0) {
            return Err(CoreError::Config("planner.risk_aversion must be finite and >= 0".into()));
        }
        if p.num_threads == Some(0) {
            return Err(CoreError::Config("planner.num_threads must be > 0 when set".into()));
        }

        self.safety_weights.validate()?;

        if !(self.cost.safety_score_weight.is_finite() && self.cost.safety_score_weight >= 0.0) {
            return Err(CoreError::Config("cost.safety_score_weight must be finite and >= 0".into()));
        }

        let pt = &self.perturbation;
        for (name, prob) in [
            ("micro_closure_prob", pt.micro_closure_prob),
            ("congestion_prob", pt.congestion_prob),
        ] {
            if !(0.0..=1.0).contains(&prob) {
                return Err(CoreError::Config(format!("perturbation.{name} must be in [0, 1]")));
            }
        }
        if !(pt.radius_m.is_finite() && pt.radius_m >= 0.0) {
            return Err(CoreError::Config("perturbation.radius_m must be finite and >= 0".into()));
        }
        if !(pt.max_congestion.is_finite() && pt.max_congestion >= 0.0) {
            return Err(CoreError::Config("perturbation.max_congestion must be finite and >= 0".into()));
        }

        if self.ingest.max_batch == 0 {
            return Err(CoreError::Config("ingest.max_batch must be > 0".into()));
        }
        Ok(())
    }
}

// ── Planner ──────────────────────────────────────────────────────────────────

/// How per-candidate rollout costs are reduced to one score.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Arithmetic mean over completed samples.
    #[default]
    Mean,
    /// Maximum over completed samples.
    WorstCase,
    /// `mean + risk_aversion × standard deviation`.
    RiskAdjusted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Rollout samples per planning cycle.
    pub rollout_count: usize,

    /// Wall-clock budget per planning cycle, milliseconds.
    pub time_budget_ms: u64,

    pub aggregation_policy: AggregationPolicy,

    /// λ for [`AggregationPolicy::RiskAdjusted`].
    pub risk_aversion: f64,

    /// Stale-commit restarts before falling back to a baseline plan on the
    /// latest version.
    pub max_restarts: u32,

    /// Seed for the session's `PlannerRng`.  The same seed and the same
    /// sequence of graph versions reproduce the same plans.
    pub seed: u64,

    /// Dedicated rollout thread count.  `None` uses rayon's global pool.
    pub num_threads: Option<usize>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            rollout_count:      32,
            time_budget_ms:     250,
            aggregation_policy: AggregationPolicy::Mean,
            risk_aversion:      0.5,
            max_restarts:       3,
            seed:               42,
            num_threads:        None,
        }
    }
}

// ── Cost ─────────────────────────────────────────────────────────────────────

/// Per-class cost multipliers.  Must be strictly increasing from `service`
/// to `highway`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SafetyWeights {
    pub service:  f64,
    pub internal: f64,
    pub arterial: f64,
    pub highway:  f64,
}

impl SafetyWeights {
    #[inline]
    pub fn penalty(&self, class: RoadClass) -> f64 {
        match class {
            RoadClass::Service  => self.service,
            RoadClass::Internal => self.internal,
            RoadClass::Arterial => self.arterial,
            RoadClass::Highway  => self.highway,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        let w = [self.service, self.internal, self.arterial, self.highway];
        if w.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(CoreError::Config("safety_weights must be finite and > 0".into()));
        }
        if !w.windows(2).all(|p| p[0] < p[1]) {
            return Err(CoreError::Config(
                "safety_weights must satisfy service < internal < arterial < highway".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SafetyWeights {
    fn default() -> Self {
        Self { service: 0.5, internal: 1.0, arterial: 2.5, highway: 25.0 }
    }
}

/// Whether highways are merely penalized or avoided outright when a
/// non-highway route exists.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighwayPolicy {
    /// Highways carry `safety_weights.highway` and compete on cost.
    #[default]
    Penalize,
    /// Highways are impassable unless no other route exists, in which case
    /// the search is repeated with `Penalize`.
    AvoidWhenPossible,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostConfig {
    pub highway_policy: HighwayPolicy,

    /// Weight of `(1 - safety_score)` as an extra multiplier.  Zero disables it.
    pub safety_score_weight: f64,
}

// ── Perturbation ─────────────────────────────────────────────────────────────

/// Rollout uncertainty model around the rider's current position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerturbationConfig {
    /// Edges whose source node lies within this distance of the current
    /// position are treated as uncertain.
    pub radius_m: f32,

    /// Chance an uncertain edge is temporarily blocked in a sample.
    pub micro_closure_prob: f64,

    /// Chance an uncertain edge is congested in a sample.
    pub congestion_prob: f64,

    /// A congested edge's cost is multiplied by `U[1, 1 + max_congestion]`.
    pub max_congestion: f64,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            radius_m:           1_000.0,
            micro_closure_prob: 0.01,
            congestion_prob:    0.2,
            max_congestion:     1.0,
        }
    }
}

// ── Session / ingest ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Maximum plan age before a refresh replan, milliseconds.
    pub replan_interval_ms: u64,

    /// Geographic positions farther than this from every node of the
    /// remaining plan count as a deviation.
    pub off_route_tolerance_m: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { replan_interval_ms: 120_000, off_route_tolerance_m: 30.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Most events coalesced into one version transition by `drain`.
    pub max_batch: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { max_batch: 256 }
    }
}
