//! Immutable graph versions and the table that publishes them.
//!
//! # Versioning model
//!
//! A [`GraphVersion`] pairs the shared, immutable [`RoadNetwork`] topology
//! with one realization of the dynamic edge state (closure flags, traffic
//! multipliers, update stamps).  Once built, a version never changes.  Updates
//! go through a [`VersionDraft`] (copy-on-write of the edge-state array) and
//! are frozen into `version + 1`.
//!
//! The [`VersionTable`] is the only shared mutable resource in the engine: an
//! atomically swappable pointer to the latest version.  Readers take an
//! `Arc<GraphVersion>` and keep it for as long as they need a consistent view;
//! they never lock and never observe a half-applied update.

use std::sync::Arc;

use arc_swap::ArcSwap;
use log::info;

use velo_core::{EdgeId, Timestamp};

use crate::{NetworkError, NetworkResult, RoadNetwork};

// ── EdgeState ─────────────────────────────────────────────────────────────────

/// Dynamic attributes of one edge in one version.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EdgeState {
    /// Congestion multiplier, always ≥ 1.0.
    pub traffic_multiplier: f32,
    pub closed: bool,
    pub last_updated: Timestamp,
}

impl EdgeState {
    pub fn open(at: Timestamp) -> Self {
        Self { traffic_multiplier: 1.0, closed: false, last_updated: at }
    }
}

// ── GraphVersion ──────────────────────────────────────────────────────────────

/// Immutable snapshot of the road network's dynamic state.
pub struct GraphVersion {
    version:      u64,
    network:      Arc<RoadNetwork>,
    edges:        Vec<EdgeState>,
    published_at: Timestamp,
}

impl GraphVersion {
    /// Version 0: every edge open with multiplier 1.0 and never updated.
    pub fn initial(network: Arc<RoadNetwork>, at: Timestamp) -> Self {
        let edges = vec![EdgeState::open(Timestamp::ZERO); network.edge_count()];
        Self { version: 0, network, edges, published_at: at }
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    /// The shared topology handle, for building sibling versions.
    pub fn network_arc(&self) -> &Arc<RoadNetwork> {
        &self.network
    }

    pub fn published_at(&self) -> Timestamp {
        self.published_at
    }

    #[inline]
    pub fn edge_state(&self, edge: EdgeId) -> Option<&EdgeState> {
        self.edges.get(edge.index())
    }

    /// `true` if `edge` is closed in this version.  Unknown edges count as
    /// closed: nothing may be routed over them.
    #[inline]
    pub fn is_closed(&self, edge: EdgeId) -> bool {
        self.edges.get(edge.index()).is_none_or(|s| s.closed)
    }

    #[inline]
    pub fn traffic_multiplier(&self, edge: EdgeId) -> Option<f32> {
        self.edges.get(edge.index()).map(|s| s.traffic_multiplier)
    }

    pub fn last_updated(&self, edge: EdgeId) -> Option<Timestamp> {
        self.edges.get(edge.index()).map(|s| s.last_updated)
    }

    /// Number of edges currently closed.
    pub fn closed_count(&self) -> usize {
        self.edges.iter().filter(|s| s.closed).count()
    }

    /// Start a copy-on-write draft of the next version.
    pub fn draft(&self) -> VersionDraft {
        VersionDraft {
            base_version: self.version,
            network:      Arc::clone(&self.network),
            edges:        self.edges.clone(),
            changed:      0,
        }
    }
}

impl std::fmt::Debug for GraphVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphVersion")
            .field("version", &self.version)
            .field("edges", &self.edges.len())
            .field("published_at", &self.published_at)
            .finish()
    }
}

// ── VersionDraft ──────────────────────────────────────────────────────────────

/// Mutable staging area for the next version.  Invisible to readers until
/// frozen and published.
pub struct VersionDraft {
    base_version: u64,
    network:      Arc<RoadNetwork>,
    edges:        Vec<EdgeState>,
    changed:      usize,
}

impl VersionDraft {
    /// Number of setter calls applied to this draft.
    pub fn changed(&self) -> usize {
        self.changed
    }

    pub fn edge_state(&self, edge: EdgeId) -> Option<&EdgeState> {
        self.edges.get(edge.index())
    }

    pub fn set_closed(&mut self, edge: EdgeId, closed: bool, at: Timestamp) -> NetworkResult<()> {
        let state = self
            .edges
            .get_mut(edge.index())
            .ok_or(NetworkError::EdgeNotFound(edge))?;
        state.closed = closed;
        state.last_updated = state.last_updated.max(at);
        self.changed += 1;
        Ok(())
    }

    pub fn set_traffic_multiplier(
        &mut self,
        edge: EdgeId,
        multiplier: f32,
        at: Timestamp,
    ) -> NetworkResult<()> {
        if !(multiplier.is_finite() && multiplier >= 1.0) {
            return Err(NetworkError::InvalidAttribute {
                edge,
                reason: format!("traffic multiplier {multiplier} must be finite and >= 1.0"),
            });
        }
        let state = self
            .edges
            .get_mut(edge.index())
            .ok_or(NetworkError::EdgeNotFound(edge))?;
        state.traffic_multiplier = multiplier;
        state.last_updated = state.last_updated.max(at);
        self.changed += 1;
        Ok(())
    }

    /// Seal the draft as `base_version + 1`.
    pub fn freeze(self, at: Timestamp) -> GraphVersion {
        GraphVersion {
            version:      self.base_version + 1,
            network:      self.network,
            edges:        self.edges,
            published_at: at,
        }
    }
}

// ── VersionTable ──────────────────────────────────────────────────────────────

/// Publishes graph versions strictly forward, one at a time.
pub struct VersionTable {
    current: ArcSwap<GraphVersion>,
}

impl VersionTable {
    pub fn new(initial: GraphVersion) -> Self {
        Self { current: ArcSwap::from_pointee(initial) }
    }

    /// The latest published version.  Lock-free.
    #[inline]
    pub fn latest(&self) -> Arc<GraphVersion> {
        self.current.load_full()
    }

    /// Version number of the latest published version.
    #[inline]
    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Atomically replace the latest version with `next`.
    ///
    /// # Errors
    ///
    /// [`NetworkError::VersionConflict`] unless `next` is exactly one past
    /// the current latest version (another publisher got there first), and
    /// [`NetworkError::TopologyMismatch`] if `next` was drafted from a
    /// different network.
    pub fn publish(&self, next: GraphVersion) -> NetworkResult<Arc<GraphVersion>> {
        let cur = self.current.load_full();
        let expected = cur.version + 1;
        if next.version != expected {
            return Err(NetworkError::VersionConflict { expected, got: next.version });
        }
        if !Arc::ptr_eq(&cur.network, &next.network) {
            return Err(NetworkError::TopologyMismatch);
        }

        let next = Arc::new(next);
        let prev = self.current.compare_and_swap(&cur, Arc::clone(&next));
        if !Arc::ptr_eq(&prev, &cur) {
            return Err(NetworkError::VersionConflict { expected: prev.version + 1, got: next.version });
        }
        info!(
            "published graph version {} ({} edges closed)",
            next.version,
            next.closed_count()
        );
        Ok(next)
    }
}
