//! Unit tests for velo-events.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use velo_core::{GeoPoint, ManualClock, RoadClass, Timestamp};
    use velo_network::{EdgeSpec, GraphVersion, RoadNetworkBuilder, VersionTable};

    use crate::EventIngestor;

    /// Three nodes in a line, two-way roads: edges 0 (0→1), 1 (1→0),
    /// 2 (1→2), 3 (2→1).
    pub fn ingestor() -> EventIngestor<Arc<ManualClock>> {
        ingestor_loaded_at(Timestamp(0))
    }

    /// Same line, with version 0 published at `loaded`.
    pub fn ingestor_loaded_at(loaded: Timestamp) -> EventIngestor<Arc<ManualClock>> {
        let mut b = RoadNetworkBuilder::new();
        let n0 = b.add_node(GeoPoint::new(28.590, 77.040));
        let n1 = b.add_node(GeoPoint::new(28.591, 77.040));
        let n2 = b.add_node(GeoPoint::new(28.592, 77.040));
        b.add_road(n0, n1, EdgeSpec::new(110.0, RoadClass::Internal));
        b.add_road(n1, n2, EdgeSpec::new(110.0, RoadClass::Arterial));
        let version = GraphVersion::initial(Arc::new(b.build().unwrap()), loaded);
        let table = Arc::new(VersionTable::new(version));
        EventIngestor::new(table, Arc::new(ManualClock::new(Timestamp(1_000))))
    }
}

// ── Single events ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod apply {
    use velo_core::{EdgeId, Timestamp};

    use crate::{EventError, IngestError, UpdateEvent};

    #[test_log::test]
    fn closure_then_reopen() {
        let ing = super::helpers::ingestor();
        let v1 = ing.apply(UpdateEvent::closure(EdgeId(2), Timestamp(10))).unwrap();
        assert_eq!(v1.version(), 1);
        assert!(v1.is_closed(EdgeId(2)));
        assert_eq!(v1.last_updated(EdgeId(2)), Some(Timestamp(10)));
        assert_eq!(v1.published_at(), Timestamp(1_000));

        let v2 = ing.apply(UpdateEvent::reopen(EdgeId(2), Timestamp(20))).unwrap();
        assert_eq!(v2.version(), 2);
        assert!(!v2.is_closed(EdgeId(2)));
        // The earlier snapshot is untouched.
        assert!(v1.is_closed(EdgeId(2)));
    }

    #[test]
    fn traffic_update_sets_multiplier() {
        let ing = super::helpers::ingestor();
        let v = ing.apply(UpdateEvent::traffic(EdgeId(0), 2.5, Timestamp(5))).unwrap();
        assert_eq!(v.traffic_multiplier(EdgeId(0)), Some(2.5));
        assert_eq!(v.traffic_multiplier(EdgeId(1)), Some(1.0));
    }

    fn assert_rejected(event: UpdateEvent, expected: EventError) {
        let ing = super::helpers::ingestor();
        let before = ing.table().latest();
        match ing.apply(event) {
            Err(IngestError::Rejected(e)) => assert_eq!(e, expected),
            other => panic!("expected rejection, got {other:?}"),
        }
        let after = ing.table().latest();
        assert_eq!(after.version(), before.version());
        assert!(std::sync::Arc::ptr_eq(&before, &after));
    }

    #[test_log::test]
    fn unknown_edge_rejected() {
        assert_rejected(
            UpdateEvent::closure(EdgeId(99), Timestamp(1)),
            EventError::UnknownEdge(EdgeId(99)),
        );
    }

    #[test]
    fn traffic_without_value_rejected() {
        let mut e = UpdateEvent::traffic(EdgeId(0), 2.0, Timestamp(1));
        e.value = None;
        assert_rejected(e, EventError::MissingValue { edge: EdgeId(0) });
    }

    #[test]
    fn traffic_below_one_rejected() {
        assert_rejected(
            UpdateEvent::traffic(EdgeId(0), 0.5, Timestamp(1)),
            EventError::InvalidValue { edge: EdgeId(0), value: 0.5 },
        );
    }

    #[test]
    fn non_finite_traffic_rejected() {
        let ing = super::helpers::ingestor();
        let err = ing
            .apply(UpdateEvent::traffic(EdgeId(0), f32::INFINITY, Timestamp(1)))
            .unwrap_err();
        assert!(matches!(err, IngestError::Rejected(EventError::InvalidValue { .. })));
        assert_eq!(ing.table().version(), 0);
    }

    #[test]
    fn closure_with_value_rejected() {
        let mut e = UpdateEvent::closure(EdgeId(1), Timestamp(1));
        e.value = Some(3.0);
        assert_rejected(
            e,
            EventError::UnexpectedValue { edge: EdgeId(1), kind: crate::EventKind::Closure },
        );
    }

    #[test_log::test]
    fn closure_stamped_before_load_applies() {
        let ing = super::helpers::ingestor_loaded_at(Timestamp(10_000));
        assert_eq!(ing.table().latest().last_updated(EdgeId(0)), Some(Timestamp::ZERO));

        let v = ing.apply(UpdateEvent::closure(EdgeId(0), Timestamp(9_000))).unwrap();
        assert!(v.is_closed(EdgeId(0)));
        assert_eq!(v.last_updated(EdgeId(0)), Some(Timestamp(9_000)));
    }

    #[test]
    fn late_stamped_closure_still_closes() {
        let ing = super::helpers::ingestor_loaded_at(Timestamp(10_000));
        ing.apply(UpdateEvent::traffic(EdgeId(1), 1.5, Timestamp(20_000))).unwrap();
        let v = ing.apply(UpdateEvent::closure(EdgeId(1), Timestamp(19_000))).unwrap();
        assert!(v.is_closed(EdgeId(1)));
        assert_eq!(v.traffic_multiplier(EdgeId(1)), Some(1.5));
        // last_updated never moves backwards.
        assert_eq!(v.last_updated(EdgeId(1)), Some(Timestamp(20_000)));
    }
}

// ── Batches & feed ────────────────────────────────────────────────────────────

#[cfg(test)]
mod batch {
    use velo_core::{EdgeId, IngestConfig, Timestamp};

    use crate::{EventError, UpdateEvent, channel};

    #[test_log::test]
    fn burst_coalesces_into_one_version() {
        let ing = super::helpers::ingestor();
        let out = ing
            .apply_batch([
                UpdateEvent::closure(EdgeId(0), Timestamp(1)),
                UpdateEvent::traffic(EdgeId(2), 1.5, Timestamp(2)),
                UpdateEvent::traffic(EdgeId(2), 3.0, Timestamp(3)),
                UpdateEvent::closure(EdgeId(50), Timestamp(4)),
            ])
            .unwrap();
        assert_eq!(out.applied, 3);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].1, EventError::UnknownEdge(EdgeId(50)));

        let v = out.version.unwrap();
        assert_eq!(v.version(), 1);
        assert_eq!(ing.table().version(), 1);
        assert!(v.is_closed(EdgeId(0)));
        // Later events in the batch win.
        assert_eq!(v.traffic_multiplier(EdgeId(2)), Some(3.0));
    }

    #[test]
    fn batch_applies_in_arrival_order() {
        let ing = super::helpers::ingestor();
        let out = ing
            .apply_batch([
                UpdateEvent::closure(EdgeId(3), Timestamp(10)),
                UpdateEvent::reopen(EdgeId(3), Timestamp(5)),
            ])
            .unwrap();
        assert_eq!(out.applied, 2);
        assert!(out.rejected.is_empty());
        let v = out.version.unwrap();
        assert!(!v.is_closed(EdgeId(3)));
        assert_eq!(v.last_updated(EdgeId(3)), Some(Timestamp(10)));
    }

    #[test]
    fn all_invalid_batch_publishes_nothing() {
        let ing = super::helpers::ingestor();
        let out = ing
            .apply_batch([UpdateEvent::traffic(EdgeId(0), 0.1, Timestamp(1))])
            .unwrap();
        assert!(out.version.is_none());
        assert_eq!(out.applied, 0);
        assert_eq!(ing.table().version(), 0);
    }

    #[test]
    fn drain_respects_max_batch() {
        let ing = super::helpers::ingestor().with_config(&IngestConfig { max_batch: 2 });
        let (tx, feed) = channel();
        tx.send_all([
            UpdateEvent::traffic(EdgeId(0), 1.2, Timestamp(1)),
            UpdateEvent::traffic(EdgeId(1), 1.3, Timestamp(1)),
            UpdateEvent::closure(EdgeId(2), Timestamp(1)),
        ])
        .unwrap();

        let first = ing.drain(&feed).unwrap();
        assert_eq!(first.applied, 2);
        assert_eq!(feed.len(), 1);
        let second = ing.drain(&feed).unwrap();
        assert_eq!(second.applied, 1);
        assert_eq!(ing.table().version(), 2);

        let idle = ing.drain(&feed).unwrap();
        assert!(idle.is_empty());
        assert_eq!(ing.table().version(), 2);
    }

    #[test]
    fn feed_reports_disconnect() {
        let (tx, feed) = channel();
        drop(tx);
        assert!(feed.recv_timeout(std::time::Duration::from_millis(1)).is_err());
    }

    #[test]
    fn concurrent_ingestors_never_lose_updates() {
        use std::sync::Arc;
        use velo_core::{ManualClock, Timestamp as Ts};
        use crate::EventIngestor;

        let base = super::helpers::ingestor();
        let table = Arc::clone(base.table());
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    let ing = EventIngestor::new(table, ManualClock::new(Ts(0)));
                    ing.apply(UpdateEvent::traffic(EdgeId(i), 2.0, Ts(1))).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let latest = table.latest();
        assert_eq!(latest.version(), 4);
        for i in 0..4 {
            assert_eq!(latest.traffic_multiplier(EdgeId(i)), Some(2.0));
        }
    }
}

// ── CSV loader ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use std::io::Cursor;

    use velo_core::{EdgeId, Timestamp};

    use crate::{EventKind, IngestError, load_events_reader};

    #[test]
    fn parses_rows_in_order() {
        let csv = "\
kind,edge_id,value,timestamp_ms
traffic_update,2,1.8,100
closure,3,,200
reopen,3,,300
";
        let events = load_events_reader(Cursor::new(csv)).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::TrafficUpdate);
        assert_eq!(events[0].value, Some(1.8));
        assert_eq!(events[1].edge, EdgeId(3));
        assert_eq!(events[1].value, None);
        assert_eq!(events[2].timestamp, Timestamp(300));
    }

    #[test_log::test]
    fn unknown_kind_is_skipped() {
        let csv = "\
kind,edge_id,value,timestamp_ms
closure,1,,5
flood,1,,6
reopen,1,,7
";
        let events = load_events_reader(Cursor::new(csv)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Closure);
        assert_eq!(events[1].kind, EventKind::Reopen);
        assert_eq!(events[1].timestamp, Timestamp(7));
    }

    #[test]
    fn malformed_row_fails() {
        let csv = "kind,edge_id,value,timestamp_ms\nclosure,not-a-number,,5\n";
        assert!(matches!(load_events_reader(Cursor::new(csv)), Err(IngestError::Csv(_))));
    }
}
