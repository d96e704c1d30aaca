// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Crash-safe edge detection
//!
//! Fresh samples are compared against the last *persisted* state per
//! generator, not against the previous in-memory sample. After a restart
//! the detector re-derives "last known state" from storage, so the first
//! cycle emits no spurious transitions. A generator whose persisted state
//! could not be established this cycle is skipped entirely rather than
//! guessed at.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::signals::GeneratorId;

/// One observed run/stop transition.
///
/// Events are append-only: produced here (or parsed from a legacy status
/// log), persisted immediately, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Generator the transition belongs to.
    pub generator: GeneratorId,
    /// Instant the transition was observed, UTC-anchored.
    pub timestamp: DateTime<Utc>,
    /// New semantic state: true when the unit started running.
    pub on: bool,
}

impl StatusEvent {
    /// Human-readable status line, matching the historical log format.
    pub fn describe(&self) -> String {
        format!(
            "gen {} {}",
            self.generator.0,
            if self.on { "on" } else { "off" }
        )
    }
}

/// Compare fresh samples against the last persisted states.
///
/// `last_persisted` holds the most recent durably stored state per
/// generator; a generator absent from the map has an unknown last state
/// (empty log, or the query failed) and emits nothing this cycle. All
/// emitted events carry the same observation timestamp `now`.
pub fn detect_transitions(
    samples: &[(GeneratorId, bool)],
    last_persisted: &HashMap<GeneratorId, bool>,
    now: DateTime<Utc>,
) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    for (generator, running) in samples {
        match last_persisted.get(generator) {
            Some(persisted) if persisted != running => {
                events.push(StatusEvent {
                    generator: *generator,
                    timestamp: now,
                    on: *running,
                });
            }
            Some(_) => {}
            None => {
                debug!("{}: last persisted state unknown, skipping", generator);
            }
        }
    }
    events
}
