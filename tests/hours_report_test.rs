// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Engine hours reporting over the durable store
//!
//! These tests run the accounting engine the way the report path does:
//! against a window of events pulled out of the JSON Lines store,
//! including events recovered from legacy free-text status lines.

use chrono::{DateTime, TimeZone, Utc};

use rust_genmonitor::acquisition::{GeneratorId, StatusEvent};
use rust_genmonitor::hours::{format_hours, parse_status_line, report_for_window};
use rust_genmonitor::storage::{EventStore, JsonlStore};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 5, hour, minute, 0).unwrap()
}

fn event(id: u8, timestamp: DateTime<Utc>, on: bool) -> StatusEvent {
    StatusEvent {
        generator: GeneratorId(id),
        timestamp,
        on,
    }
}

#[test]
fn report_reconstructs_hours_from_stored_events() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::open(dir.path()).unwrap();

    // gen1: a 2h30m run with a duplicate ON observation.
    store.append_event(&event(1, at(9, 0), true)).unwrap();
    store.append_event(&event(1, at(9, 0), true)).unwrap();
    store.append_event(&event(1, at(11, 30), false)).unwrap();
    // gen2: still running at query time.
    store.append_event(&event(2, at(9, 0), true)).unwrap();
    // gen3: lone OFF from before the window.
    store.append_event(&event(3, at(9, 0), false)).unwrap();

    let generators = [GeneratorId(1), GeneratorId(2), GeneratorId(3)];
    let report = report_for_window(&store, &generators, at(0, 0), at(12, 0), at(10, 15)).unwrap();

    assert_eq!(report[0].formatted(), "2:30");
    assert_eq!(report[1].formatted(), "1:15");
    assert_eq!(report[2].formatted(), "0:00");
}

#[test]
fn report_ignores_events_outside_the_window() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::open(dir.path()).unwrap();

    store.append_event(&event(1, at(1, 0), true)).unwrap();
    store.append_event(&event(1, at(2, 0), false)).unwrap();
    store.append_event(&event(1, at(9, 0), true)).unwrap();
    store.append_event(&event(1, at(10, 0), false)).unwrap();

    let report = report_for_window(
        &store,
        &[GeneratorId(1)],
        at(8, 0),
        at(12, 0),
        at(12, 0),
    )
    .unwrap();

    assert_eq!(report[0].total_seconds, 3600);
}

#[test]
fn legacy_status_lines_feed_the_same_fold() {
    // A historical log row carries "gen N on/off" text plus a timestamp.
    let rows = [
        ("gen 1 on", at(9, 0)),
        ("gen 1 on", at(9, 30)),
        ("gen 1 off", at(11, 30)),
    ];

    let events: Vec<StatusEvent> = rows
        .iter()
        .filter_map(|(line, timestamp)| {
            parse_status_line(line).map(|(generator, on)| StatusEvent {
                generator,
                timestamp: *timestamp,
                on,
            })
        })
        .collect();

    assert_eq!(events.len(), 3);
    // The earliest ON start stays authoritative for the legacy path too.
    let total = rust_genmonitor::hours::accumulate(&events, at(12, 0));
    assert_eq!(format_hours(total), "2:30");
}
