//! Planner error type.

use thiserror::Error;

use velo_core::NodeId;
use velo_network::NetworkError;

/// Errors produced by a planning cycle.
///
/// A stale version read is handled inside the planner by restarting the
/// cycle and never appears here.  Running out of time is not an error
/// either: the plan comes back flagged approximate.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Origin and destination are not connected through open edges in the
    /// latest version.  Fatal for the cycle; not retried.
    #[error("no route from {from} to {to}")]
    NoRouteFound { from: NodeId, to: NodeId },

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("rollout thread pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

pub type PlanResult<T> = Result<T, PlanError>;
