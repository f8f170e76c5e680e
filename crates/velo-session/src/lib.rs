//! `velo-session` — per-rider route sessions.
//!
//! A [`RouteSession`] owns one trip: it asks the shared
//! [`RolloutPlanner`](velo_planner::RolloutPlanner) for a plan, tracks the
//! rider's progress along it and replans when the rider deviates, an edge
//! ahead closes, or the plan grows old.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`session`] | `RouteSession`, `PlanHandle`                              |
//! | [`status`]  | `Position`, `SessionStatus`, `ReplanTrigger`              |
//! | [`output`]  | `RouteOutput`, `write_route_csv`                          |
//! | [`error`]   | `SessionError`, `SessionResult<T>`                        |
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                     |
//! |-----------|------------------------------------------------------------|
//! | `fx-hash` | FxHash instead of SipHash for the plan's node index.       |

pub mod error;
mod index;
pub mod output;
pub mod session;
pub mod status;

#[cfg(test)]
mod tests;

pub use error::{SessionError, SessionResult};
pub use output::{RouteOutput, write_route_csv, write_route_writer};
pub use session::{PlanHandle, RouteSession};
pub use status::{Position, ReplanTrigger, SessionStatus};
