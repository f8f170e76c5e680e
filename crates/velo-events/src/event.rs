//! Update events delivered by the traffic/closure feed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use velo_core::{EdgeId, Timestamp};

use crate::IngestError;

/// What an [`UpdateEvent`] does to its edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The edge becomes impassable.
    Closure,
    /// A closed edge becomes passable again.
    Reopen,
    /// The edge's traffic multiplier is replaced by the event's value.
    TrafficUpdate,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Closure       => "closure",
            EventKind::Reopen        => "reopen",
            EventKind::TrafficUpdate => "traffic_update",
        }
    }

    /// `true` for kinds that must carry a value.
    pub fn takes_value(self) -> bool {
        matches!(self, EventKind::TrafficUpdate)
    }
}

impl FromStr for EventKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closure"        => Ok(EventKind::Closure),
            "reopen"         => Ok(EventKind::Reopen),
            "traffic_update" => Ok(EventKind::TrafficUpdate),
            other => Err(IngestError::Parse(format!("unknown event kind {other:?}"))),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change to one edge, stamped with the time it was observed.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub kind:      EventKind,
    pub edge:      EdgeId,
    /// Traffic multiplier for `TrafficUpdate`; absent otherwise.
    pub value:     Option<f32>,
    pub timestamp: Timestamp,
}

impl UpdateEvent {
    pub fn closure(edge: EdgeId, timestamp: Timestamp) -> Self {
        Self { kind: EventKind::Closure, edge, value: None, timestamp }
    }

    pub fn reopen(edge: EdgeId, timestamp: Timestamp) -> Self {
        Self { kind: EventKind::Reopen, edge, value: None, timestamp }
    }

    pub fn traffic(edge: EdgeId, multiplier: f32, timestamp: Timestamp) -> Self {
        Self { kind: EventKind::TrafficUpdate, edge, value: Some(multiplier), timestamp }
    }
}

impl fmt::Display for UpdateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(f, "{} {} = {} @ {}", self.kind, self.edge, v, self.timestamp),
            None    => write!(f, "{} {} @ {}", self.kind, self.edge, self.timestamp),
        }
    }
}
