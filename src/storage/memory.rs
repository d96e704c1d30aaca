// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory store
//!
//! Backs the test suite and short-lived tooling. Not durable.

use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{EventStore, SnapshotStore};
use crate::acquisition::edge::StatusEvent;
use crate::acquisition::signals::GeneratorId;
use crate::acquisition::stream::TelemetrySnapshot;

/// In-memory event and snapshot log.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<Vec<StatusEvent>>,
    snapshots: Mutex<Vec<TelemetrySnapshot>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted events, for assertions.
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Number of persisted snapshots, for assertions.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

impl EventStore for MemoryStore {
    fn append_event(&self, event: &StatusEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn latest_event(&self, generator: GeneratorId) -> Result<Option<StatusEvent>> {
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| e.generator == generator)
            .max_by_key(|e| e.timestamp)
            .cloned())
    }

    fn events_in_range(
        &self,
        generator: GeneratorId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StatusEvent>> {
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| e.generator == generator && e.timestamp >= from && e.timestamp < to)
            .cloned()
            .collect())
    }
}

impl SnapshotStore for MemoryStore {
    fn append_snapshot(&self, snapshot: &TelemetrySnapshot) -> Result<()> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    fn latest_snapshot_at(&self) -> Result<Option<DateTime<Utc>>> {
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots.iter().map(|s| s.timestamp).max())
    }

    fn snapshots_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TelemetrySnapshot>> {
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots
            .iter()
            .filter(|s| s.timestamp >= from && s.timestamp < to)
            .cloned()
            .collect())
    }
}
