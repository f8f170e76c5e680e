//! Rider positions and what a session call did in response.

use std::fmt;

use velo_core::{EdgeId, GeoPoint, NodeId};

/// Where the rider is, as reported by the client.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Position {
    /// Standing at an intersection.
    AtNode(NodeId),
    /// Somewhere along an edge, heading to its head node.
    OnEdge(EdgeId),
    /// A raw GPS fix; snapped to the nearest node.
    Geo(GeoPoint),
}

/// Why a session replanned.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReplanTrigger {
    /// First plan of the trip.
    Initial,
    /// The rider left the active plan.
    Deviation,
    /// An edge still ahead on the plan was closed.
    EdgeInvalidated,
    /// The plan outlived `session.replan_interval_ms`.
    MaxAge,
    /// The previous replan found no route; trying again.
    Recovery,
}

impl ReplanTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplanTrigger::Initial         => "initial",
            ReplanTrigger::Deviation       => "deviation",
            ReplanTrigger::EdgeInvalidated => "edge_invalidated",
            ReplanTrigger::MaxAge          => "max_age",
            ReplanTrigger::Recovery        => "recovery",
        }
    }
}

impl fmt::Display for ReplanTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of `start`, `update_position` or `poll`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// The active plan still holds.
    OnPlan,
    /// A new plan was swapped in.
    Replanned(ReplanTrigger),
    /// The rider is at the destination.
    Arrived,
}
