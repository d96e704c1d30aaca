// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JSON Lines store
//!
//! File-backed implementation of the storage seams: one JSON document per
//! line, appended and never rewritten. The most recent record per key is
//! indexed in memory at open time and kept current on every append, so
//! point lookups never touch the disk and a writer always sees its own
//! writes. Range queries scan the file.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{EventStore, SnapshotStore};
use crate::acquisition::edge::StatusEvent;
use crate::acquisition::signals::GeneratorId;
use crate::acquisition::stream::TelemetrySnapshot;

const EVENTS_FILE: &str = "events.jsonl";
const SNAPSHOTS_FILE: &str = "snapshots.jsonl";

struct Inner {
    events_file: File,
    snapshots_file: File,
    latest_events: HashMap<GeneratorId, StatusEvent>,
    latest_snapshot: Option<DateTime<Utc>>,
}

/// JSON Lines event and snapshot log rooted in one directory.
pub struct JsonlStore {
    events_path: PathBuf,
    snapshots_path: PathBuf,
    inner: Mutex<Inner>,
}

impl JsonlStore {
    /// Open (or create) the store in `dir`.
    ///
    /// Existing logs are scanned once to rebuild the most-recent index.
    /// A torn final line left by a crash is skipped with a warning; it
    /// must not prevent the store from opening.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {:?}", dir))?;

        let events_path = dir.join(EVENTS_FILE);
        let snapshots_path = dir.join(SNAPSHOTS_FILE);

        let mut latest_events: HashMap<GeneratorId, StatusEvent> = HashMap::new();
        for event in scan_lines::<StatusEvent>(&events_path)? {
            let current = latest_events.get(&event.generator);
            if current.map_or(true, |c| event.timestamp >= c.timestamp) {
                latest_events.insert(event.generator, event);
            }
        }

        let latest_snapshot = scan_lines::<TelemetrySnapshot>(&snapshots_path)?
            .into_iter()
            .map(|s| s.timestamp)
            .max();

        debug!(
            "Opened store at {:?}: {} generator(s) with persisted state",
            dir,
            latest_events.len()
        );

        let events_file = open_append(&events_path)?;
        let snapshots_file = open_append(&snapshots_path)?;

        Ok(Self {
            events_path,
            snapshots_path,
            inner: Mutex::new(Inner {
                events_file,
                snapshots_file,
                latest_events,
                latest_snapshot,
            }),
        })
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))
}

/// Read every parseable record out of a JSON Lines file.
fn scan_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file =
        File::open(path).with_context(|| format!("Failed to read log file {:?}", path))?;
    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line from {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping malformed record {}:{}: {}", path.display(), number + 1, e),
        }
    }
    Ok(records)
}

/// Append one record as a single line followed by a flush.
fn append_line<T: Serialize>(file: &mut File, record: &T, path: &Path) -> Result<()> {
    let mut line =
        serde_json::to_string(record).context("Failed to serialize record to JSON")?;
    line.push('\n');
    file.write_all(line.as_bytes())
        .with_context(|| format!("Failed to append to {:?}", path))?;
    file.flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;
    Ok(())
}

impl EventStore for JsonlStore {
    fn append_event(&self, event: &StatusEvent) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        append_line(&mut inner.events_file, event, &self.events_path)?;
        inner.latest_events.insert(event.generator, event.clone());
        Ok(())
    }

    fn latest_event(&self, generator: GeneratorId) -> Result<Option<StatusEvent>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.latest_events.get(&generator).cloned())
    }

    fn events_in_range(
        &self,
        generator: GeneratorId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StatusEvent>> {
        Ok(scan_lines::<StatusEvent>(&self.events_path)?
            .into_iter()
            .filter(|e| e.generator == generator && e.timestamp >= from && e.timestamp < to)
            .collect())
    }
}

impl SnapshotStore for JsonlStore {
    fn append_snapshot(&self, snapshot: &TelemetrySnapshot) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        append_line(&mut inner.snapshots_file, snapshot, &self.snapshots_path)?;
        inner.latest_snapshot = Some(snapshot.timestamp);
        Ok(())
    }

    fn latest_snapshot_at(&self) -> Result<Option<DateTime<Utc>>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.latest_snapshot)
    }

    fn snapshots_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TelemetrySnapshot>> {
        Ok(scan_lines::<TelemetrySnapshot>(&self.snapshots_path)?
            .into_iter()
            .filter(|s| s.timestamp >= from && s.timestamp < to)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

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
    fn append_is_immediately_visible() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::open(dir.path()).unwrap();

        store.append_event(&event(1, at(9, 0), true)).unwrap();
        let latest = store.latest_event(GeneratorId(1)).unwrap().unwrap();
        assert!(latest.on);
        assert_eq!(latest.timestamp, at(9, 0));
    }

    #[test]
    fn latest_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlStore::open(dir.path()).unwrap();
            store.append_event(&event(1, at(9, 0), true)).unwrap();
            store.append_event(&event(1, at(11, 30), false)).unwrap();
            store.append_event(&event(2, at(10, 0), true)).unwrap();
        }

        let store = JsonlStore::open(dir.path()).unwrap();
        let latest = store.latest_event(GeneratorId(1)).unwrap().unwrap();
        assert!(!latest.on);
        assert!(store.latest_event(GeneratorId(2)).unwrap().unwrap().on);
        assert!(store.latest_event(GeneratorId(3)).unwrap().is_none());
    }

    #[test]
    fn range_query_is_half_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::open(dir.path()).unwrap();
        store.append_event(&event(1, at(9, 0), true)).unwrap();
        store.append_event(&event(1, at(10, 0), false)).unwrap();
        store.append_event(&event(1, at(11, 0), true)).unwrap();

        let window = store
            .events_in_range(GeneratorId(1), at(9, 0), at(11, 0))
            .unwrap();
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn torn_final_line_is_skipped_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlStore::open(dir.path()).unwrap();
            store.append_event(&event(1, at(9, 0), true)).unwrap();
        }
        // Simulate a crash mid-append.
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(EVENTS_FILE))
            .unwrap();
        file.write_all(b"{\"generator\":\"gen1\",\"times").unwrap();
        drop(file);

        let store = JsonlStore::open(dir.path()).unwrap();
        let latest = store.latest_event(GeneratorId(1)).unwrap().unwrap();
        assert_eq!(latest.timestamp, at(9, 0));
    }

    #[test]
    fn snapshot_timestamps_are_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::open(dir.path()).unwrap();
        assert!(store.latest_snapshot_at().unwrap().is_none());

        let snapshot = TelemetrySnapshot {
            timestamp: at(9, 0),
            readings: Default::default(),
        };
        store.append_snapshot(&snapshot).unwrap();
        assert_eq!(store.latest_snapshot_at().unwrap(), Some(at(9, 0)));
    }
}
