//! `velo-events` — closure/traffic update events and their ingestion.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`event`]     | `UpdateEvent`, `EventKind`                                |
//! | [`feed`]      | `channel()`, `EventSender`, `EventFeed` (crossbeam)       |
//! | [`ingestor`]  | `EventIngestor`, `BatchOutcome`                           |
//! | [`loader`]    | `load_events_csv`, `load_events_reader`                   |
//! | [`error`]     | `EventError` (per-event rejection), `IngestError`         |

pub mod error;
pub mod event;
pub mod feed;
pub mod ingestor;
pub mod loader;

#[cfg(test)]
mod tests;

pub use error::{EventError, IngestError, IngestResult};
pub use event::{EventKind, UpdateEvent};
pub use feed::{EventFeed, EventSender, channel};
pub use ingestor::{BatchOutcome, EventIngestor};
pub use loader::{load_events_csv, load_events_reader};
