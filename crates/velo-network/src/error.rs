//! Network-subsystem error type.

use thiserror::Error;

use velo_core::{EdgeId, NodeId};

/// Errors produced by `velo-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found in network")]
    EdgeNotFound(EdgeId),

    #[error("invalid edge {from} -> {to}: {reason}")]
    InvalidEdge { from: NodeId, to: NodeId, reason: String },

    #[error("invalid attribute for {edge}: {reason}")]
    InvalidAttribute { edge: EdgeId, reason: String },

    #[error("search interrupted by deadline")]
    Interrupted,

    #[error("version conflict: expected to publish {expected}, got {got}")]
    VersionConflict { expected: u64, got: u64 },

    #[error("published version must share the session's topology")]
    TopologyMismatch,

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for NetworkError {
    fn from(e: csv::Error) -> Self {
        NetworkError::Csv(e.to_string())
    }
}

pub type NetworkResult<T> = Result<T, NetworkError>;
