//! Event-subsystem error types.

use thiserror::Error;

use velo_core::EdgeId;
use velo_network::NetworkError;

use crate::EventKind;

/// Why a single event was rejected.  A rejected event leaves the published
/// graph untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),

    #[error("traffic update for {edge} carries no value")]
    MissingValue { edge: EdgeId },

    #[error("{kind} event for {edge} must not carry a value")]
    UnexpectedValue { edge: EdgeId, kind: EventKind },

    #[error("invalid traffic multiplier {value} for {edge}: must be finite and >= 1.0")]
    InvalidValue { edge: EdgeId, value: f32 },
}

/// Errors produced while loading or ingesting events.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("rejected event: {0}")]
    Rejected(#[from] EventError),

    #[error("event parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("event feed disconnected")]
    Disconnected,

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for IngestError {
    fn from(e: csv::Error) -> Self {
        IngestError::Csv(e.to_string())
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
