// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Live telemetry streaming
//!
//! This module provides a shared data structure for streaming decoded
//! telemetry snapshots from the poll loop to live consumers. Publishing
//! is fire-and-forget: every snapshot reaches the stream whether or not
//! it also passes the durable persistence gate, and a stream with no
//! subscribers accepts snapshots without error.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::modbus::decode::ReadingValue;

/// One fully decoded set of named readings taken at a single instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Instant the snapshot was taken, UTC-anchored.
    pub timestamp: DateTime<Utc>,
    /// Decoded readings keyed by their display name.
    pub readings: BTreeMap<String, ReadingValue>,
}

impl TelemetrySnapshot {
    /// Create a snapshot stamped with the current instant.
    pub fn new(readings: BTreeMap<String, ReadingValue>) -> Self {
        Self {
            timestamp: Utc::now(),
            readings,
        }
    }
}

/// Shared telemetry stream for broadcasting snapshots to multiple consumers
#[derive(Clone, Debug)]
pub struct SharedTelemetryStream {
    /// Broadcast sender for real-time streaming
    sender: broadcast::Sender<TelemetrySnapshot>,
    /// Latest snapshot for new subscribers
    latest_snapshot: Arc<RwLock<Option<TelemetrySnapshot>>>,
    /// Stream statistics
    stats: Arc<RwLock<StreamStats>>,
}

/// Statistics about the telemetry stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStats {
    /// Total number of snapshots published
    pub total_snapshots: u64,
    /// Number of active subscribers
    pub active_subscribers: usize,
    /// Last update timestamp in milliseconds since the epoch
    pub last_update: u64,
}

impl Default for StreamStats {
    fn default() -> Self {
        Self {
            total_snapshots: 0,
            active_subscribers: 0,
            last_update: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }
}

impl SharedTelemetryStream {
    /// Create a new shared telemetry stream
    ///
    /// ### Parameters
    /// * `buffer_size` - Size of the broadcast channel buffer
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);

        Self {
            sender,
            latest_snapshot: Arc::new(RwLock::new(None)),
            stats: Arc::new(RwLock::new(StreamStats::default())),
        }
    }

    /// Get a receiver for subscribing to the stream
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetrySnapshot> {
        self.sender.subscribe()
    }

    /// Publish a new snapshot to all subscribers
    pub async fn publish(&self, snapshot: TelemetrySnapshot) -> Result<()> {
        // Update latest snapshot
        {
            let mut latest = self.latest_snapshot.write().await;
            *latest = Some(snapshot.clone());
        }

        // Update statistics
        {
            let mut stats = self.stats.write().await;
            stats.total_snapshots += 1;
            stats.active_subscribers = self.sender.receiver_count();
            stats.last_update = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
        }

        // Broadcast to subscribers
        match self.sender.send(snapshot) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => {
                // No active receivers, but this is not an error
                Ok(())
            }
        }
    }

    /// Get the latest snapshot (for new subscribers)
    pub async fn get_latest_snapshot(&self) -> Option<TelemetrySnapshot> {
        self.latest_snapshot.read().await.clone()
    }

    /// Get current stream statistics
    pub async fn get_stats(&self) -> StreamStats {
        self.stats.read().await.clone()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(name: &str, value: ReadingValue) -> TelemetrySnapshot {
        let mut readings = BTreeMap::new();
        readings.insert(name.to_string(), value);
        TelemetrySnapshot::new(readings)
    }

    #[tokio::test]
    async fn publish_reaches_subscribers_and_latest_cache() {
        let stream = SharedTelemetryStream::new(8);
        let mut receiver = stream.subscribe();

        let snapshot = snapshot_with("L1 Voltage", ReadingValue::Text("231.50".into()));
        stream.publish(snapshot.clone()).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received, snapshot);
        assert_eq!(stream.get_latest_snapshot().await, Some(snapshot));
        assert_eq!(stream.get_stats().await.total_snapshots, 1);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let stream = SharedTelemetryStream::new(8);
        let snapshot = snapshot_with("L1 Voltage", ReadingValue::Unavailable);
        assert!(stream.publish(snapshot).await.is_ok());
        assert_eq!(stream.subscriber_count(), 0);
    }
}
