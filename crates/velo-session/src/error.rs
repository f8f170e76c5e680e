//! Error types for velo-session.

use thiserror::Error;

use velo_core::{EdgeId, GeoPoint, NodeId};
use velo_planner::PlanError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// `update_position` or `poll` called before `start`.
    #[error("session not started")]
    NotStarted,

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found in network")]
    EdgeNotFound(EdgeId),

    /// A geographic position could not be snapped because the network has
    /// no nodes.
    #[error("no network node near {0:?}")]
    NoNearbyNode(GeoPoint),

    /// Planning failed.  For `NoRouteFound` the active plan has been cleared.
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, SessionError>`.
pub type SessionResult<T> = Result<T, SessionError>;
