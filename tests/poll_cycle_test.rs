// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End-to-end poll cycle tests
//!
//! These tests drive single poll cycles against scripted signal and
//! register sources and an in-memory store, covering the full ordering
//! contract: edge detection against persisted state, immediate event
//! persistence, live publication of every snapshot, and the durable
//! sampling gate.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use rust_genmonitor::acquisition::{GeneratorId, PollDaemon, SignalSource, StatusEvent};
use rust_genmonitor::hours::{accumulate, format_hours};
use rust_genmonitor::modbus::client::{LinkError, MeterReader, RegisterLink};
use rust_genmonitor::storage::{EventStore, MemoryStore};

/// Signal source driven by a shared, externally mutable state table.
struct ScriptedSignals {
    states: Arc<Mutex<Vec<(GeneratorId, bool)>>>,
}

impl SignalSource for ScriptedSignals {
    fn sample(&mut self) -> Result<Vec<(GeneratorId, bool)>> {
        Ok(self.states.lock().unwrap().clone())
    }
}

/// Register link answering every burst with zeroed words.
struct ZeroedLink;

#[async_trait]
impl RegisterLink for ZeroedLink {
    async fn read_registers(&mut self, _address: u16, count: u16) -> Result<Vec<u16>, LinkError> {
        Ok(vec![0; count as usize])
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
}

fn scripted_daemon(
    initial: Vec<(GeneratorId, bool)>,
    store: Arc<MemoryStore>,
) -> (PollDaemon, Arc<Mutex<Vec<(GeneratorId, bool)>>>) {
    let states = Arc::new(Mutex::new(initial));
    let signals = ScriptedSignals {
        states: states.clone(),
    };
    let meter = MeterReader::new(Box::new(ZeroedLink)).unwrap();
    let daemon = PollDaemon::new(
        Box::new(signals),
        Some(meter),
        store.clone(),
        store,
        2000,
        600,
    );
    (daemon, states)
}

fn seed_state(store: &MemoryStore, generator: GeneratorId, on: bool) {
    store
        .append_event(&StatusEvent {
            generator,
            timestamp: Utc::now(),
            on,
        })
        .unwrap();
}

#[tokio::test]
async fn full_run_is_reconstructed_from_persisted_events() {
    let store = Arc::new(MemoryStore::new());
    seed_state(&store, GeneratorId(1), false);

    let (mut daemon, states) = scripted_daemon(vec![(GeneratorId(1), false)], store.clone());

    // Stable state: nothing is emitted.
    let report = daemon.run_cycle().await;
    assert_eq!(report.events_persisted, 0);

    // The unit starts.
    states.lock().unwrap()[0].1 = true;
    let report = daemon.run_cycle().await;
    assert_eq!(report.events_persisted, 1);

    // Still running: the edge was already persisted.
    let report = daemon.run_cycle().await;
    assert_eq!(report.events_persisted, 0);

    // The unit stops.
    states.lock().unwrap()[0].1 = false;
    let report = daemon.run_cycle().await;
    assert_eq!(report.events_persisted, 1);

    // The persisted log reconstructs a closed, near-zero-length run.
    let events = store
        .events_in_range(
            GeneratorId(1),
            Utc::now() - chrono::Duration::hours(1),
            Utc::now() + chrono::Duration::seconds(1),
        )
        .unwrap();
    assert_eq!(events.len(), 3); // seed + on + off
    let total = accumulate(&events, Utc::now());
    assert_eq!(format_hours(total), "0:00");
}

#[tokio::test]
async fn every_snapshot_is_published_but_persistence_is_gated() {
    let store = Arc::new(MemoryStore::new());
    let (mut daemon, _states) = scripted_daemon(vec![(GeneratorId(1), false)], store.clone());
    let mut subscriber = daemon.get_stream().subscribe();

    let first = daemon.run_cycle().await;
    let second = daemon.run_cycle().await;

    // Both snapshots reached the live stream.
    assert!(first.snapshot_published && second.snapshot_published);
    assert!(subscriber.try_recv().is_ok());
    assert!(subscriber.try_recv().is_ok());

    // Only the first passed the 10 minute gate.
    assert!(first.snapshot_persisted);
    assert!(!second.snapshot_persisted);
    assert_eq!(store.snapshot_count(), 1);
}

#[tokio::test]
async fn unknown_generators_never_produce_events() {
    let store = Arc::new(MemoryStore::new());
    // No seed: the log is empty, the last state is unknown.
    let (mut daemon, states) = scripted_daemon(vec![(GeneratorId(1), true)], store.clone());

    daemon.run_cycle().await;
    states.lock().unwrap()[0].1 = false;
    daemon.run_cycle().await;

    assert_eq!(store.event_count(), 0);
}
