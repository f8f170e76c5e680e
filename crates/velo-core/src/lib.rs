//! `velo-core` — foundational types for the velo bicycle routing engine.
//!
//! This crate is a dependency of every other `velo-*` crate.  It has no
//! `velo-*` dependencies and few external ones (`rand`, `thiserror`, `serde`,
//! `toml`).
//!
//! # What lives here
//!
//! | Module          | Contents                                               |
//! |-----------------|--------------------------------------------------------|
//! | [`ids`]         | `NodeId`, `EdgeId`                                     |
//! | [`geo`]         | `GeoPoint`, haversine distance                         |
//! | [`time`]        | `Timestamp`, `Clock`, `SystemClock`, `ManualClock`     |
//! | [`rng`]         | `PlannerRng` (per session), `RolloutRng` (per sample)  |
//! | [`road_class`]  | `RoadClass` safety classes                             |
//! | [`config`]      | `Config` and its sections, TOML loading                |
//! | [`error`]       | `CoreError`, `CoreResult`                              |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod road_class;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{
    AggregationPolicy, Config, CostConfig, HighwayPolicy, IngestConfig, PerturbationConfig,
    PlannerConfig, SafetyWeights, SessionConfig,
};
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{EdgeId, NodeId};
pub use rng::{PlannerRng, RolloutRng};
pub use road_class::RoadClass;
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
