// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Run-time accounting engine
//!
//! Reconstructs cumulative ON duration per generator from the sparse,
//! irregularly-timestamped status event log. The engine is a pure fold
//! over time-ordered events: duplicate ON observations never restart an
//! open interval (the earliest start in a run is authoritative), an OFF
//! without a preceding ON is a transition from before the observed window
//! and is ignored, and an interval still open at query time is closed
//! against "now". Recomputing over the same events and the same "now"
//! always yields the same total.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::acquisition::edge::StatusEvent;
use crate::acquisition::signals::GeneratorId;
use crate::storage::EventStore;

/// Cumulative ON duration of one generator.
///
/// Always recomputed from the event log; never itself persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeneratorHours {
    /// Generator the total belongs to.
    pub generator: GeneratorId,
    /// Total ON duration in seconds.
    pub total_seconds: u64,
}

impl GeneratorHours {
    /// The total formatted as `H:MM`.
    pub fn formatted(&self) -> String {
        format_hours(self.total_seconds)
    }
}

/// Fold one generator's events into its total ON duration in seconds.
///
/// Events may arrive in any order; a working copy is sorted by timestamp
/// before the fold since the store guarantees no ordering. The generator
/// field of the events is not inspected; callers group per generator
/// first (see [`generator_hours`]).
pub fn accumulate(events: &[StatusEvent], now: DateTime<Utc>) -> u64 {
    let mut ordered: Vec<&StatusEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut total_seconds: i64 = 0;
    let mut open_start: Option<DateTime<Utc>> = None;

    for event in ordered {
        if event.on {
            // Earliest ON start in a run is authoritative.
            if open_start.is_none() {
                open_start = Some(event.timestamp);
            }
        } else {
            if let Some(start) = open_start {
                if event.timestamp > start {
                    total_seconds += (event.timestamp - start).num_seconds();
                }
                // Reset regardless of the delta sign.
                open_start = None;
            }
            // OFF without a prior ON happened before the window; ignore.
        }
    }

    // Still ON at the end: count until now.
    if let Some(start) = open_start {
        if now > start {
            total_seconds += (now - start).num_seconds();
        }
    }

    total_seconds.max(0) as u64
}

/// Fold a mixed event log into per-generator totals.
///
/// Generators never share event streams; each is folded independently.
pub fn generator_hours(
    events: &[StatusEvent],
    now: DateTime<Utc>,
) -> BTreeMap<GeneratorId, GeneratorHours> {
    let mut grouped: BTreeMap<GeneratorId, Vec<StatusEvent>> = BTreeMap::new();
    for event in events {
        grouped.entry(event.generator).or_default().push(event.clone());
    }

    grouped
        .into_iter()
        .map(|(generator, events)| {
            let total_seconds = accumulate(&events, now);
            (
                generator,
                GeneratorHours {
                    generator,
                    total_seconds,
                },
            )
        })
        .collect()
}

/// Format a second total as `H:MM`.
///
/// Hours are unbounded; minutes are the floored remainder, zero-padded.
pub fn format_hours(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    format!("{}:{:02}", hours, minutes)
}

/// Parse a legacy state word: `1/true/on/yes` and `0/false/off/no`.
pub fn parse_state_word(word: &str) -> Option<bool> {
    match word.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a legacy free-text status line such as `gen 1 on`.
///
/// Historical logs carry these strings instead of structured events.
/// Parsed lines feed the same fold as structured events, so the
/// earliest-start rule applies to both paths.
pub fn parse_status_line(line: &str) -> Option<(GeneratorId, bool)> {
    let lower = line.trim().to_ascii_lowercase();
    let rest = lower.strip_prefix("gen")?;
    let mut parts = rest.split_whitespace();
    let id: u8 = parts.next()?.parse().ok()?;
    let state = parse_state_word(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    if id == 0 {
        return None;
    }
    Some((GeneratorId(id), state))
}

/// Compute per-generator hours over a stored window.
///
/// Events with `from <= timestamp < to` are folded per generator and any
/// interval still open is closed against `now`. A generator with no
/// events in the window reports zero.
pub fn report_for_window(
    store: &dyn EventStore,
    generators: &[GeneratorId],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<GeneratorHours>> {
    let mut report = Vec::with_capacity(generators.len());
    for generator in generators {
        let events = store.events_in_range(*generator, from, to)?;
        debug!("{}: {} event(s) in window", generator, events.len());
        let total_seconds = accumulate(&events, now);
        report.push(GeneratorHours {
            generator: *generator,
            total_seconds,
        });
    }
    Ok(report)
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
    fn duplicate_on_keeps_earliest_start() {
        let events = vec![
            event(1, at(9, 0), true),
            event(1, at(9, 0), true),
            event(1, at(11, 30), false),
        ];
        let total = accumulate(&events, at(12, 0));
        assert_eq!(format_hours(total), "2:30");
    }

    #[test]
    fn open_interval_is_closed_against_now() {
        let events = vec![event(1, at(9, 0), true)];
        let total = accumulate(&events, at(10, 15));
        assert_eq!(format_hours(total), "1:15");
        assert!(total >= 3600);
    }

    #[test]
    fn lone_off_is_ignored() {
        let events = vec![event(1, at(9, 0), false)];
        let total = accumulate(&events, at(12, 0));
        assert_eq!(format_hours(total), "0:00");
    }

    #[test]
    fn accumulate_is_idempotent() {
        let events = vec![
            event(1, at(9, 0), true),
            event(1, at(10, 0), false),
            event(1, at(11, 0), true),
        ];
        let now = at(11, 45);
        assert_eq!(accumulate(&events, now), accumulate(&events, now));
    }

    #[test]
    fn accumulate_sorts_before_folding() {
        let ordered = vec![
            event(1, at(9, 0), true),
            event(1, at(10, 0), false),
            event(1, at(10, 30), true),
            event(1, at(11, 0), false),
        ];
        let mut shuffled = ordered.clone();
        shuffled.swap(0, 3);
        shuffled.swap(1, 2);
        let now = at(12, 0);
        assert_eq!(accumulate(&ordered, now), accumulate(&shuffled, now));
        assert_eq!(accumulate(&ordered, now), 5400);
    }

    #[test]
    fn closing_off_never_decreases_total() {
        let open = vec![event(1, at(9, 0), true)];
        let now = at(10, 0);
        let open_total = accumulate(&open, now);

        let mut closed = open.clone();
        closed.push(event(1, at(10, 30), false));
        assert!(accumulate(&closed, now) >= open_total);
    }

    #[test]
    fn off_at_start_instant_closes_without_counting() {
        // Zero and negative deltas add nothing but still reset the run.
        let events = vec![
            event(1, at(9, 0), true),
            event(1, at(9, 0), false),
            event(1, at(9, 30), true),
            event(1, at(10, 0), false),
        ];
        assert_eq!(accumulate(&events, at(12, 0)), 1800);
    }

    #[test]
    fn generators_do_not_share_streams() {
        let events = vec![
            event(1, at(9, 0), true),
            event(2, at(9, 30), true),
            event(1, at(10, 0), false),
            event(2, at(11, 0), false),
        ];
        let totals = generator_hours(&events, at(12, 0));
        assert_eq!(totals[&GeneratorId(1)].total_seconds, 3600);
        assert_eq!(totals[&GeneratorId(2)].total_seconds, 5400);
        assert_eq!(totals[&GeneratorId(1)].formatted(), "1:00");
    }

    #[test]
    fn formatting_floors_minutes() {
        assert_eq!(format_hours(0), "0:00");
        assert_eq!(format_hours(3599), "0:59");
        assert_eq!(format_hours(3600), "1:00");
        assert_eq!(format_hours(9000), "2:30");
        assert_eq!(format_hours(90000), "25:00");
    }

    #[test]
    fn legacy_status_lines_parse() {
        assert_eq!(
            parse_status_line("gen 1 on"),
            Some((GeneratorId(1), true))
        );
        assert_eq!(
            parse_status_line("GEN 3 OFF"),
            Some((GeneratorId(3), false))
        );
        assert_eq!(
            parse_status_line("gen2 yes"),
            Some((GeneratorId(2), true))
        );
        assert_eq!(parse_status_line("gen x on"), None);
        assert_eq!(parse_status_line("pump 1 on"), None);
        assert_eq!(parse_status_line("gen 1 on extra"), None);
        assert_eq!(parse_status_line("gen 0 on"), None);
    }

    #[test]
    fn state_words_follow_legacy_rules() {
        for word in ["1", "true", "on", "yes", "ON", "Yes"] {
            assert_eq!(parse_state_word(word), Some(true), "{}", word);
        }
        for word in ["0", "false", "off", "no"] {
            assert_eq!(parse_state_word(word), Some(false), "{}", word);
        }
        assert_eq!(parse_state_word("maybe"), None);
    }
}
