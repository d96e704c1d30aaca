// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Durable storage seams
//!
//! Status events and telemetry snapshots are persisted through two small
//! append-only traits. The monitor only ever appends, asks for the most
//! recent record, or scans a time range; anything that can do those three
//! things can back the monitor. Both in-tree implementations offer
//! read-your-writes consistency, which the edge detector relies on to see
//! its own most recent persisted event.

pub mod jsonl;
pub mod memory;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::acquisition::edge::StatusEvent;
use crate::acquisition::signals::GeneratorId;
use crate::acquisition::stream::TelemetrySnapshot;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

/// Append-only log of generator status events.
pub trait EventStore: Send + Sync {
    /// Durably append one event. Each append is a single atomic write.
    fn append_event(&self, event: &StatusEvent) -> Result<()>;

    /// Most recent persisted event for one generator, if any.
    fn latest_event(&self, generator: GeneratorId) -> Result<Option<StatusEvent>>;

    /// Events for one generator with `from <= timestamp < to`.
    ///
    /// No ordering is guaranteed; the accounting engine sorts before
    /// folding.
    fn events_in_range(
        &self,
        generator: GeneratorId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StatusEvent>>;
}

/// Append-only log of telemetry snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Durably append one snapshot.
    fn append_snapshot(&self, snapshot: &TelemetrySnapshot) -> Result<()>;

    /// Timestamp of the most recent persisted snapshot, if any.
    fn latest_snapshot_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// Snapshots with `from <= timestamp < to`.
    fn snapshots_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TelemetrySnapshot>>;
}
