//! Deterministic RNG wrappers for planning cycles and rollout samples.
//!
//! # Determinism strategy
//!
//! Randomness is never ambient.  A session owns one [`PlannerRng`] seeded from
//! configuration and hands `&mut` to each planning cycle.  The cycle draws
//! one seed per rollout sample *sequentially* and each sample builds its own
//! [`RolloutRng`] from that seed:
//!
//!   sample_seed = cycle_draw XOR (sample_index * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive sample indices across the seed space.  This
//! means:
//!
//! - Samples never share RNG state (no contention, no ordering dependency).
//! - A cycle produces the same sample set regardless of how rayon schedules
//!   the samples across worker threads.
//! - All RNG calls are local to the owning thread; no synchronisation needed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── PlannerRng ───────────────────────────────────────────────────────────────

/// Per-session RNG injected into every planning cycle.
///
/// Used only from the thread that drives the session.  Parallel rollouts get
/// their own [`RolloutRng`]s derived via [`sample_seeds`](Self::sample_seeds).
pub struct PlannerRng(SmallRng);

impl PlannerRng {
    pub fn new(seed: u64) -> Self {
        PlannerRng(SmallRng::seed_from_u64(seed))
    }

    /// Draw `count` independent sample seeds for one planning cycle.
    pub fn sample_seeds(&mut self, count: usize) -> Vec<u64> {
        (0..count as u64)
            .map(|i| self.0.r#gen::<u64>() ^ i.wrapping_mul(MIXING_CONSTANT))
            .collect()
    }
}

// ── RolloutRng ───────────────────────────────────────────────────────────────

/// RNG owned by exactly one rollout sample.
pub struct RolloutRng(SmallRng);

impl RolloutRng {
    pub fn from_seed(seed: u64) -> Self {
        RolloutRng(SmallRng::seed_from_u64(seed))
    }

    /// Uniform `f64` in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}
