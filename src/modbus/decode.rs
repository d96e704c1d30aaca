// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register word decoding
//!
//! Pure functions turning raw 16-bit register words into typed readings
//! according to the register map. Single-register magnitudes are scaled
//! and emitted as two-decimal text; 32-bit power values are plain
//! integers with no scale applied; 64-bit energy counters are unsigned
//! integers in Wh/Varh/VAh.

use serde::{Deserialize, Serialize};

use super::registers::{ReadingSpec, WordCount};

/// Decoded value of one meter reading.
///
/// Serializes into the shape downstream consumers expect: two-decimal
/// text for scaled magnitudes, bare integers for power and energy, and
/// null for a reading the meter did not return this cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    /// The register burst was too short to cover this reading.
    Unavailable,
    /// Scaled single-register magnitude, formatted to two decimals.
    Text(String),
    /// 32-bit power value, sign-extended when the map declares it signed.
    Integer(i64),
    /// 64-bit energy counter.
    Counter(u64),
}

impl ReadingValue {
    /// True when the meter did not return this reading.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ReadingValue::Unavailable)
    }
}

/// Decode one reading out of a register burst.
///
/// `words` is the full burst and `offset` the index of the reading's
/// first word within it. A burst too short to cover the reading yields
/// [`ReadingValue::Unavailable`] rather than indexing out of range.
pub fn decode_reading(words: &[u16], offset: usize, spec: &ReadingSpec) -> ReadingValue {
    let width = spec.words.words() as usize;
    let Some(slice) = words.get(offset..offset + width) else {
        return ReadingValue::Unavailable;
    };

    match spec.words {
        WordCount::One => {
            let raw = if spec.signed {
                slice[0] as i16 as f64
            } else {
                slice[0] as f64
            };
            ReadingValue::Text(format!("{:.2}", raw * spec.scale))
        }
        WordCount::Two => {
            let raw = ((slice[0] as u32) << 16) | slice[1] as u32;
            // The declared scale is intentionally not applied here:
            // downstream reports assume raw W/Var/VA integers.
            if spec.signed {
                ReadingValue::Integer(raw as i32 as i64)
            } else {
                ReadingValue::Integer(raw as i64)
            }
        }
        WordCount::Four => {
            let raw = ((slice[0] as u64) << 48)
                | ((slice[1] as u64) << 32)
                | ((slice[2] as u64) << 16)
                | slice[3] as u64;
            ReadingValue::Counter(raw)
        }
    }
}
