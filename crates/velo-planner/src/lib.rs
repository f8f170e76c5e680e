//! `velo-planner` — the online rollout planner.
//!
//! Given a version table, an origin and a destination, the planner returns a
//! [`RoutePlan`] that is good under current conditions and robust to
//! near-term uncertainty around the rider, within a fixed time budget.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`planner`]   | `RolloutPlanner`: cycles, commit check, stale restarts   |
//! | [`rollout`]   | `RolloutBatch`, `RolloutSample`, perturbation model      |
//! | [`aggregate`] | `Aggregator`: mean, worst case, risk adjusted            |
//! | [`plan`]      | `PlanRequest`, `RoutePlan`                               |
//! | [`observer`]  | `PlannerObserver`, `NoopObserver`, `CycleStats`          |
//! | [`error`]     | `PlanError`, `PlanResult<T>`                             |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | (default) Runs rollout samples on Rayon's thread pool. |

pub mod aggregate;
pub mod error;
pub mod observer;
pub mod plan;
pub mod planner;
pub mod rollout;


pub use aggregate::Aggregator;
pub use error::{PlanError, PlanResult};
pub use observer::{CycleStats, NoopObserver, PlannerObserver};
pub use plan::{PlanRequest, RoutePlan};
pub use planner::RolloutPlanner;
pub use rollout::{RolloutBatch, RolloutSample, perturb};
