//! CSV event-log loader, for replaying recorded closure and traffic feeds.
//!
//! # CSV format
//!
//! ```csv
//! kind,edge_id,value,timestamp_ms
//! traffic_update,12,1.8,1700000000000
//! closure,40,,1700000005000
//! reopen,40,,1700000090000
//! ```
//!
//! Rows are returned in file order.  Rows with an unrecognised `kind` are
//! skipped with a warning.  Values are not validated here; the ingestor
//! rejects malformed events when they are applied.

use std::io::Read;
use std::path::Path;

use log::warn;
use serde::Deserialize;

use velo_core::{EdgeId, Timestamp};

use crate::{EventKind, IngestResult, UpdateEvent};

#[derive(Deserialize)]
struct EventRecord {
    kind:         String,
    edge_id:      u32,
    value:        Option<f32>,
    timestamp_ms: u64,
}

/// Load an event log from a CSV file.
pub fn load_events_csv(path: &Path) -> IngestResult<Vec<UpdateEvent>> {
    let file = std::fs::File::open(path)?;
    load_events_reader(file)
}

/// Like [`load_events_csv`] but accepts any `Read` source.
pub fn load_events_reader<R: Read>(reader: R) -> IngestResult<Vec<UpdateEvent>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut events = Vec::new();
    for (line, row) in rdr.deserialize::<EventRecord>().enumerate() {
        let row = row?;
        let kind = match row.kind.parse::<EventKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("skipping event row {}: {e}", line + 2);
                continue;
            }
        };
        events.push(UpdateEvent {
            kind,
            edge:      EdgeId(row.edge_id),
            value:     row.value,
            timestamp: Timestamp(row.timestamp_ms),
        });
    }
    Ok(events)
}
