// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Persistence configuration
//!
//! This module defines the structures for configuring durable storage of
//! status events and telemetry snapshots.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for durable storage.
///
/// Status events are persisted on every detected transition; telemetry
/// snapshots pass through a time-windowed sampling gate so the snapshot
/// log grows slowly regardless of the poll cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the event and snapshot logs.
    pub data_dir: PathBuf,

    /// Minimum interval in seconds between two persisted snapshots.
    ///
    /// Snapshots produced inside this window are still published to live
    /// subscribers, they are just not written to the durable log.
    /// Must be greater than zero.
    pub snapshot_min_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            snapshot_min_interval_secs: 600, // Log a snapshot every 10 minutes
        }
    }
}
