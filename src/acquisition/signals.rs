// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Generator run/stop signal sampling
//!
//! The [`SignalSource`] trait is the seam between the monitor and the
//! digital run/stop lines. Implementations return polarity-normalized
//! states: `true` always means "the generator is running", whatever the
//! wiring does on the physical line. Hardware access itself stays outside
//! this crate; the in-tree implementation simulates a fleet.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::GeneratorChannel;

/// Opaque identifier of a monitored generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneratorId(pub u8);

/// Error parsing a generator identifier from text.
#[derive(Debug, Error)]
#[error("invalid generator id: {0:?}")]
pub struct ParseGeneratorIdError(String);

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

impl FromStr for GeneratorId {
    type Err = ParseGeneratorIdError;

    /// Accepts both the bare number ("3") and the persisted form ("gen3").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("gen").unwrap_or(s.trim());
        digits
            .trim()
            .parse::<u8>()
            .map(GeneratorId)
            .map_err(|_| ParseGeneratorIdError(s.to_string()))
    }
}

impl Serialize for GeneratorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GeneratorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Normalize a raw line level to a semantic running state.
///
/// Active-low wiring reads true while the unit is stopped, so the level
/// is inverted before anything downstream sees it.
pub fn normalize_level(raw_level: bool, active_low: bool) -> bool {
    if active_low {
        !raw_level
    } else {
        raw_level
    }
}

/// A source of polarity-normalized generator run states.
#[cfg_attr(test, mockall::automock)]
pub trait SignalSource: Send {
    /// Sample every monitored line once.
    ///
    /// Returns one `(generator, running)` pair per configured channel.
    fn sample(&mut self) -> Result<Vec<(GeneratorId, bool)>>;
}

/// Simulated fleet used for development and tests.
///
/// Each simulated line holds its raw level and occasionally flips, which
/// exercises the same polarity normalization path a hardware source
/// would use.
pub struct SimulatedSignalSource {
    lines: Vec<(GeneratorId, bool, bool)>, // (id, raw_level, active_low)
    flip_probability: f64,
}

impl SimulatedSignalSource {
    /// Build a simulated fleet from the configured channels.
    ///
    /// Every unit starts stopped; `flip_probability` is the per-cycle
    /// chance that a unit changes state.
    pub fn new(channels: &[GeneratorChannel], flip_probability: f64) -> Self {
        let lines = channels
            .iter()
            .map(|channel| {
                // Raw level of a stopped unit depends on the polarity.
                let stopped_level = channel.active_low;
                (GeneratorId(channel.id), stopped_level, channel.active_low)
            })
            .collect();
        Self {
            lines,
            flip_probability,
        }
    }
}

impl SignalSource for SimulatedSignalSource {
    fn sample(&mut self) -> Result<Vec<(GeneratorId, bool)>> {
        let mut rng = rand::rng();
        let mut states = Vec::with_capacity(self.lines.len());
        for (id, raw_level, active_low) in &mut self.lines {
            if rng.random_bool(self.flip_probability) {
                *raw_level = !*raw_level;
            }
            states.push((*id, normalize_level(*raw_level, *active_low)));
        }
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_id_round_trips_through_text() {
        let id = GeneratorId(3);
        assert_eq!(id.to_string(), "gen3");
        assert_eq!("gen3".parse::<GeneratorId>().unwrap(), id);
        assert_eq!("3".parse::<GeneratorId>().unwrap(), id);
        assert!("genx".parse::<GeneratorId>().is_err());
    }

    #[test]
    fn generator_id_serializes_as_persisted_form() {
        let json = serde_json::to_string(&GeneratorId(2)).unwrap();
        assert_eq!(json, "\"gen2\"");
        let back: GeneratorId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GeneratorId(2));
    }

    #[test]
    fn active_low_line_inverts() {
        // Line high means stopped on active-low wiring.
        assert!(!normalize_level(true, true));
        assert!(normalize_level(false, true));
        // Active-high wiring passes through.
        assert!(normalize_level(true, false));
        assert!(!normalize_level(false, false));
    }

    #[test]
    fn simulated_fleet_starts_stopped() {
        let channels = crate::config::GeneratorsConfig::default().channels;
        let mut source = SimulatedSignalSource::new(&channels, 0.0);
        let states = source.sample().unwrap();
        assert_eq!(states.len(), channels.len());
        assert!(states.iter().all(|(_, running)| !running));
    }
}
