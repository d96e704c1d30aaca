// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll loop
//!
//! This module provides the daemon that drives one monitoring cycle after
//! another: sample the run/stop lines, detect transitions against the
//! persisted state, persist them, read and decode the meter, publish the
//! snapshot live, and gate its durable write. Everything the cycle needs
//! is owned by the daemon and handed to it at construction; there is no
//! ambient connection state.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, error, info, warn};
use tokio::time::interval;

use super::edge::detect_transitions;
use super::signals::{GeneratorId, SignalSource};
use super::stream::SharedTelemetryStream;
use crate::modbus::client::MeterReader;
use crate::storage::{EventStore, SnapshotStore};

/// Decide whether a decoded snapshot is written to durable storage.
///
/// Returns true when no snapshot has ever been persisted, so at least one
/// durable record exists, and otherwise once at least `min_interval` has
/// elapsed since the last durable write. Live broadcasting is independent
/// of this gate.
pub fn should_persist(
    last_persisted: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    min_interval: ChronoDuration,
) -> bool {
    match last_persisted {
        None => true,
        Some(last) => now - last >= min_interval,
    }
}

/// Outcome of one poll cycle, mainly for tests and cycle-level logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Number of status events durably appended this cycle.
    pub events_persisted: usize,
    /// Whether a snapshot was decoded and published live.
    pub snapshot_published: bool,
    /// Whether the published snapshot also passed the persistence gate.
    pub snapshot_persisted: bool,
}

/// Poll daemon that continuously reconciles generator state and meter
/// telemetry against durable storage.
pub struct PollDaemon {
    /// Polarity-normalized run/stop line source
    signals: Box<dyn SignalSource>,
    /// Meter reader, absent when the meter link is disabled
    meter: Option<MeterReader>,
    /// Durable status event log
    events: Arc<dyn EventStore>,
    /// Durable snapshot log
    snapshots: Arc<dyn SnapshotStore>,
    /// Shared stream for broadcasting snapshots
    stream: SharedTelemetryStream,
    /// Cycle cadence
    interval: Duration,
    /// Durable snapshot sampling window
    min_snapshot_interval: ChronoDuration,
    /// Flag to control daemon execution
    running: Arc<AtomicBool>,
    /// Cycle counter
    cycle_counter: Arc<AtomicU64>,
}

impl PollDaemon {
    /// Create a new poll daemon.
    ///
    /// ### Parameters
    /// * `signals` - The run/stop line source to sample
    /// * `meter` - Meter reader, or `None` when the link is disabled
    /// * `events` - Durable status event log
    /// * `snapshots` - Durable snapshot log
    /// * `interval_ms` - Cycle cadence in milliseconds
    /// * `snapshot_min_interval_secs` - Durable snapshot sampling window
    pub fn new(
        signals: Box<dyn SignalSource>,
        meter: Option<MeterReader>,
        events: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
        interval_ms: u64,
        snapshot_min_interval_secs: u64,
    ) -> Self {
        Self {
            signals,
            meter,
            events,
            snapshots,
            stream: SharedTelemetryStream::new(16),
            interval: Duration::from_millis(interval_ms),
            min_snapshot_interval: ChronoDuration::seconds(snapshot_min_interval_secs as i64),
            running: Arc::new(AtomicBool::new(false)),
            cycle_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get a reference to the shared stream for consumers
    pub fn get_stream(&self) -> &SharedTelemetryStream {
        &self.stream
    }

    /// Get a handle to the running flag, for external shutdown
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Start the poll daemon
    pub async fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::Relaxed) {
            warn!("Poll daemon is already running");
            return Ok(());
        }

        self.running.store(true, Ordering::Relaxed);
        info!(
            "Starting poll daemon with cycle interval {:?}",
            self.interval
        );

        let mut ticker = interval(self.interval);
        while self.running.load(Ordering::Relaxed) {
            ticker.tick().await;

            let report = self.run_cycle().await;
            let cycle = self.cycle_counter.fetch_add(1, Ordering::Relaxed);
            if cycle % 100 == 0 {
                let stats = self.stream.get_stats().await;
                debug!(
                    "Cycle {}: {} snapshots published, {} subscribers",
                    cycle, stats.total_snapshots, stats.active_subscribers
                );
            }
            if report.events_persisted > 0 {
                debug!(
                    "Cycle {}: {} transition(s) persisted",
                    cycle, report.events_persisted
                );
            }
        }

        // Release the protocol connection on the way out.
        if let Some(meter) = self.meter.as_mut() {
            if let Err(e) = meter.close().await {
                warn!("Failed to close meter link: {}", e);
            }
        }

        info!("Poll daemon stopped");
        Ok(())
    }

    /// Stop the poll daemon after the current cycle
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        info!("Stopping poll daemon");
    }

    /// Check if the daemon is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Get current cycle count
    pub fn cycle_count(&self) -> u64 {
        self.cycle_counter.load(Ordering::Relaxed)
    }

    /// Run one full poll cycle.
    ///
    /// Every failure mode degrades to skipping the affected data point:
    /// a failed signal sample suppresses events but not the snapshot, a
    /// failed meter read suppresses the snapshot but not the events, and
    /// a failed event append is retried naturally next cycle because the
    /// persisted state it was compared against has not advanced.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let now = Utc::now();
        let mut report = CycleReport::default();

        match self.signals.sample() {
            Ok(samples) => {
                let last_persisted = self.load_last_persisted(&samples);
                for event in detect_transitions(&samples, &last_persisted, now) {
                    match self.events.append_event(&event) {
                        Ok(()) => {
                            info!("Persisted transition: {}", event.describe());
                            report.events_persisted += 1;
                        }
                        Err(e) => {
                            error!("Failed to persist {}: {:#}", event.describe(), e);
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Signal sampling failed, no events this cycle: {:#}", e);
            }
        }

        if let Some(meter) = self.meter.as_mut() {
            match meter.read_snapshot().await {
                Ok(snapshot) => {
                    report.snapshot_published = true;
                    if let Err(e) = self.stream.publish(snapshot.clone()).await {
                        warn!("Live publish failed: {:#}", e);
                        report.snapshot_published = false;
                    }

                    match self.snapshots.latest_snapshot_at() {
                        Ok(last) => {
                            if should_persist(last, snapshot.timestamp, self.min_snapshot_interval)
                            {
                                match self.snapshots.append_snapshot(&snapshot) {
                                    Ok(()) => {
                                        debug!("Snapshot persisted at {}", snapshot.timestamp);
                                        report.snapshot_persisted = true;
                                    }
                                    Err(e) => error!("Failed to persist snapshot: {:#}", e),
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Last snapshot query failed, skipping durable write: {:#}", e);
                        }
                    }
                }
                Err(e) => {
                    warn!("Meter read failed, snapshot skipped this cycle: {}", e);
                }
            }
        }

        report
    }

    /// Fetch the most recent persisted state for each sampled generator.
    ///
    /// Generators whose query fails or whose log is empty are left out of
    /// the map; the detector then skips them for this cycle.
    fn load_last_persisted(
        &self,
        samples: &[(GeneratorId, bool)],
    ) -> HashMap<GeneratorId, bool> {
        let mut last = HashMap::new();
        for (generator, _) in samples {
            match self.events.latest_event(*generator) {
                Ok(Some(event)) => {
                    last.insert(*generator, event.on);
                }
                Ok(None) => debug!("{}: no persisted state yet", generator),
                Err(e) => warn!("{}: persisted state query failed: {:#}", generator, e),
            }
        }
        last
    }
}
