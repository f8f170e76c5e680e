//! Event ingestor: the only writer of the version table.
//!
//! # Atomicity
//!
//! Every event, or every batch of events, is staged in a [`VersionDraft`] of
//! the latest version and published as exactly one new version.  Readers
//! either see all of a transition's effects or none of them.
//!
//! # Validation
//!
//! Events are staged in arrival order, so when a batch updates the same edge
//! twice the later event wins whatever its timestamp.  An edge's
//! `last_updated` only moves forward.  Rejected events are logged at `warn`
//! and skipped; they never reach a published version.
//!
//! # Conflicts
//!
//! If another publisher wins the race for `version + 1`, the whole draft is
//! rebuilt on top of the new latest version and published again.

use std::sync::Arc;

use log::{debug, warn};

use velo_core::{Clock, IngestConfig, SystemClock};
use velo_network::{GraphVersion, NetworkError, VersionDraft, VersionTable};

use crate::{EventError, EventFeed, EventKind, IngestResult, UpdateEvent};

/// Result of [`EventIngestor::apply_batch`].
#[derive(Debug)]
pub struct BatchOutcome {
    /// The published version, or `None` if no event in the batch was valid.
    pub version:  Option<Arc<GraphVersion>>,
    pub applied:  usize,
    pub rejected: Vec<(UpdateEvent, EventError)>,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.applied == 0 && self.rejected.is_empty()
    }
}

/// Applies update events to the shared [`VersionTable`].
pub struct EventIngestor<C: Clock = SystemClock> {
    table:     Arc<VersionTable>,
    clock:     C,
    max_batch: usize,
}

impl<C: Clock> EventIngestor<C> {
    pub fn new(table: Arc<VersionTable>, clock: C) -> Self {
        Self { table, clock, max_batch: IngestConfig::default().max_batch }
    }

    pub fn with_config(mut self, cfg: &IngestConfig) -> Self {
        self.max_batch = cfg.max_batch.max(1);
        self
    }

    pub fn table(&self) -> &Arc<VersionTable> {
        &self.table
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    /// Validate and apply one event, publishing exactly one new version.
    ///
    /// # Errors
    ///
    /// [`IngestError::Rejected`](crate::IngestError::Rejected) if the event
    /// is malformed; the published version is unchanged.
    pub fn apply(&self, event: UpdateEvent) -> IngestResult<Arc<GraphVersion>> {
        loop {
            let base = self.table.latest();
            let mut draft = base.draft();
            if let Err(e) = stage(&mut draft, &event) {
                warn!("rejected event {event}: {e}");
                return Err(e.into());
            }
            match self.table.publish(draft.freeze(self.clock.now())) {
                Ok(published) => return Ok(published),
                Err(NetworkError::VersionConflict { expected, got }) => {
                    debug!("publish of version {got} lost to a concurrent writer (now expecting {expected}); retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Apply all valid events in arrival order as a single version
    /// transition.  Invalid events are reported in the outcome and skipped.
    pub fn apply_batch<I>(&self, events: I) -> IngestResult<BatchOutcome>
    where
        I: IntoIterator<Item = UpdateEvent>,
    {
        let events: Vec<UpdateEvent> = events.into_iter().collect();
        loop {
            let base = self.table.latest();
            let mut draft = base.draft();
            let mut applied = 0;
            let mut rejected = Vec::new();
            for event in &events {
                match stage(&mut draft, event) {
                    Ok(()) => applied += 1,
                    Err(e) => rejected.push((*event, e)),
                }
            }

            let version = if applied == 0 {
                None
            } else {
                match self.table.publish(draft.freeze(self.clock.now())) {
                    Ok(published) => Some(published),
                    Err(NetworkError::VersionConflict { got, .. }) => {
                        debug!("batch publish of version {got} lost to a concurrent writer; retrying");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            };

            for (event, e) in &rejected {
                warn!("rejected event {event}: {e}");
            }
            if let Some(v) = &version {
                debug!(
                    "batch of {} events -> version {} ({} applied, {} rejected)",
                    events.len(),
                    v.version(),
                    applied,
                    rejected.len()
                );
            }
            return Ok(BatchOutcome { version, applied, rejected });
        }
    }

    /// Take up to `max_batch` pending events from `feed` and apply them as
    /// one batch.  Returns an empty outcome if nothing was pending.
    pub fn drain(&self, feed: &EventFeed) -> IngestResult<BatchOutcome> {
        let events = feed.try_take(self.max_batch);
        if events.is_empty() {
            return Ok(BatchOutcome { version: None, applied: 0, rejected: Vec::new() });
        }
        self.apply_batch(events)
    }
}

/// Validate `event` and stage its effect on the draft.  Events apply in
/// arrival order; an older timestamp never hides a later-arriving event.
fn stage(draft: &mut VersionDraft, event: &UpdateEvent) -> Result<(), EventError> {
    let edge = event.edge;
    if draft.edge_state(edge).is_none() {
        return Err(EventError::UnknownEdge(edge));
    }

    match (event.kind.takes_value(), event.value) {
        (true, None) => Err(EventError::MissingValue { edge }),
        (true, Some(value)) => draft
            .set_traffic_multiplier(edge, value, event.timestamp)
            .map_err(|_| EventError::InvalidValue { edge, value }),
        (false, Some(_)) => Err(EventError::UnexpectedValue { edge, kind: event.kind }),
        (false, None) => draft
            .set_closed(edge, event.kind == EventKind::Closure, event.timestamp)
            .map_err(|_| EventError::UnknownEdge(edge)),
    }
}
