//! In-process event feed.
//!
//! The external traffic/closure collaborator pushes [`UpdateEvent`]s through
//! an [`EventSender`]; the ingestor drains the matching [`EventFeed`].  The
//! channel is unbounded and FIFO, so arrival order is consumption order.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::{IngestError, IngestResult, UpdateEvent};

/// Create a connected sender/feed pair.
pub fn channel() -> (EventSender, EventFeed) {
    let (tx, rx) = unbounded();
    (EventSender { tx }, EventFeed { rx })
}

/// Producer half.  Cheap to clone; one per upstream source.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<UpdateEvent>,
}

impl EventSender {
    pub fn send(&self, event: UpdateEvent) -> IngestResult<()> {
        self.tx.send(event).map_err(|_| IngestError::Disconnected)
    }

    /// Send every event in order, stopping at the first failure.
    pub fn send_all<I: IntoIterator<Item = UpdateEvent>>(&self, events: I) -> IngestResult<()> {
        events.into_iter().try_for_each(|e| self.send(e))
    }
}

/// Consumer half, owned by whoever drives the ingestor.
#[derive(Debug)]
pub struct EventFeed {
    rx: Receiver<UpdateEvent>,
}

impl EventFeed {
    /// Pending events not yet taken.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Take up to `max` pending events without blocking.
    pub fn try_take(&self, max: usize) -> Vec<UpdateEvent> {
        self.rx.try_iter().take(max).collect()
    }

    /// Block until an event arrives or `timeout` elapses.
    ///
    /// Returns `Ok(None)` on timeout and [`IngestError::Disconnected`] once
    /// every sender has been dropped and the feed is empty.
    pub fn recv_timeout(&self, timeout: Duration) -> IngestResult<Option<UpdateEvent>> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(IngestError::Disconnected),
        }
    }
}
