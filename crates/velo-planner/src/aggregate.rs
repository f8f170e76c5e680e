//! Reduction of per-sample candidate costs to one score.
//!
//! | Policy          | Score                                   |
//! |-----------------|-----------------------------------------|
//! | `Mean`          | arithmetic mean                         |
//! | `WorstCase`     | maximum                                 |
//! | `RiskAdjusted`  | mean + λ × population standard deviation |
//!
//! A single `∞` sample (destination unreachable through the candidate)
//! makes every policy's score `∞`.  An empty sample set scores `∞` too.

use velo_core::AggregationPolicy;

/// Aggregation policy with its parameter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aggregator {
    pub policy:        AggregationPolicy,
    /// λ for `RiskAdjusted`; ignored otherwise.
    pub risk_aversion: f64,
}

impl Aggregator {
    pub fn new(policy: AggregationPolicy, risk_aversion: f64) -> Self {
        Self { policy, risk_aversion }
    }

    pub fn aggregate(&self, samples: &[f64]) -> f64 {
        if samples.is_empty() || samples.iter().any(|c| !c.is_finite()) {
            return f64::INFINITY;
        }
        match self.policy {
            AggregationPolicy::Mean => mean(samples),
            AggregationPolicy::WorstCase => samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregationPolicy::RiskAdjusted => {
                let m = mean(samples);
                let var = samples.iter().map(|c| (c - m) * (c - m)).sum::<f64>() / samples.len() as f64;
                m + self.risk_aversion * var.sqrt()
            }
        }
    }
}

#[inline]
fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}
