//! Rollout samples: one simulated realization of near-term conditions each.
//!
//! # Perturbation model
//!
//! Only *uncertain* edges are perturbed: open edges whose source node lies
//! within `perturbation.radius_m` of the rider.  For each, independently:
//!
//! ```text
//! u < micro_closure_prob               → cost = ∞        (micro-closure)
//! else with prob. congestion_prob      → cost × U[1, 1 + max_congestion]
//! ```
//!
//! Candidate first edges are observed directly and are never micro-closed.
//!
//! # Evaluation
//!
//! One reverse search from the destination under the perturbed costs gives
//! `dist'(v)` for every node, so each candidate `e = (origin → v)` scores
//! `cost'(e) + dist'(v)` with a single search per sample.

use velo_core::{EdgeId, NodeId, PerturbationConfig, RolloutRng};
use velo_network::{RoadNetwork, Router, SearchDeadline};

/// Outcome of one completed sample.
#[derive(Clone, Debug, PartialEq)]
pub struct RolloutSample {
    pub seed: u64,
    /// Perturbed cost-to-destination through each candidate, in candidate
    /// order.  `∞` where the destination is unreachable.
    pub candidate_costs: Vec<f64>,
}

/// Read-only inputs shared by every sample of one planning cycle.
pub struct RolloutBatch<'a, R: Router> {
    pub router:       &'a R,
    pub network:      &'a RoadNetwork,
    /// Unperturbed costs of the cycle's version, indexed by `EdgeId`.
    pub base_costs:   &'a [f64],
    pub uncertain:    &'a [EdgeId],
    pub candidates:   &'a [EdgeId],
    pub destination:  NodeId,
    pub perturbation: &'a PerturbationConfig,
    pub deadline:     SearchDeadline,
}

impl<R: Router> RolloutBatch<'_, R> {
    /// Run one sample per seed.  Samples that start after the deadline or
    /// whose search is interrupted are dropped, so the result may be shorter
    /// than `seeds`.  Order follows `seeds` regardless of scheduling.
    pub fn run(&self, seeds: &[u64]) -> Vec<RolloutSample> {
        #[cfg(not(feature = "parallel"))]
        {
            seeds.iter().filter_map(|&seed| self.run_sample(seed)).collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            seeds.par_iter().filter_map(|&seed| self.run_sample(seed)).collect()
        }
    }

    /// Run a single sample.  `None` if the deadline passed first.
    pub fn run_sample(&self, seed: u64) -> Option<RolloutSample> {
        if self.deadline.expired() {
            return None;
        }

        let mut rng = RolloutRng::from_seed(seed);
        let mut costs = self.base_costs.to_vec();
        perturb(&mut costs, self.uncertain, self.candidates, self.perturbation, &mut rng);

        let dist = self
            .router
            .costs_to(self.network, &costs, self.destination, self.deadline)
            .ok()?;

        let candidate_costs = self
            .candidates
            .iter()
            .map(|e| {
                let head = self.network.edge_to[e.index()];
                costs[e.index()] + dist[head.index()]
            })
            .collect();
        Some(RolloutSample { seed, candidate_costs })
    }
}

/// Apply one random realization to `costs` in place.
pub fn perturb(
    costs: &mut [f64],
    uncertain: &[EdgeId],
    protected: &[EdgeId],
    cfg: &PerturbationConfig,
    rng: &mut RolloutRng,
) {
    for &edge in uncertain {
        let Some(cost) = costs.get_mut(edge.index()) else {
            continue;
        };
        if !cost.is_finite() {
            continue;
        }
        if rng.unit() < cfg.micro_closure_prob && !protected.contains(&edge) {
            *cost = f64::INFINITY;
        } else if rng.gen_bool(cfg.congestion_prob) {
            *cost *= 1.0 + rng.unit() * cfg.max_congestion;
        }
    }
}
