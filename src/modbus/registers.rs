// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Meter register map
//!
//! Static mapping from protocol address to a named reading with its word
//! width, signedness, scale factor and unit. The map covers only the
//! read-only registers exposed by the metering device; it is loaded once
//! and never mutated.

/// Number of consecutive 16-bit words a reading occupies on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    /// Single 16-bit register.
    One,
    /// Two registers forming a 32-bit value, big word first.
    Two,
    /// Four registers forming a 64-bit value, big word first.
    Four,
}

impl WordCount {
    /// Width of the reading in registers.
    pub fn words(self) -> u16 {
        match self {
            WordCount::One => 1,
            WordCount::Two => 2,
            WordCount::Four => 4,
        }
    }
}

/// One named reading in the meter register map.
///
/// Within one reading, `words.words()` consecutive protocol addresses
/// starting at `address` are reserved and must not overlap another
/// reading's range.
#[derive(Debug, Clone, Copy)]
pub struct ReadingSpec {
    /// First protocol address of the reading.
    pub address: u16,
    /// Display name of the reading, also the snapshot key.
    pub name: &'static str,
    /// Number of registers the reading occupies.
    pub words: WordCount,
    /// Whether the raw value is a two's complement signed quantity.
    pub signed: bool,
    /// Scale factor applied to single-register readings.
    pub scale: f64,
    /// Engineering unit of the scaled value.
    pub unit: &'static str,
}

impl ReadingSpec {
    const fn new(
        address: u16,
        name: &'static str,
        words: WordCount,
        signed: bool,
        scale: f64,
        unit: &'static str,
    ) -> Self {
        Self {
            address,
            name,
            words,
            signed,
            scale,
            unit,
        }
    }

    /// First address past the end of this reading's register range.
    pub fn end_address(&self) -> u16 {
        self.address + self.words.words()
    }
}

/// Register map of the metering device.
///
/// Addresses and scale factors follow the meter vendor's register table:
/// voltages in 0.1 V steps, currents in mA, frequencies in 10 mHz steps,
/// power factors in 0.001 steps, power totals as 32-bit integers and
/// energy counters as 64-bit integers.
pub const METER_REGISTERS: &[ReadingSpec] = &[
    ReadingSpec::new(4000, "L1 Voltage", WordCount::One, false, 0.1, "V"),
    ReadingSpec::new(4001, "L2 Voltage", WordCount::One, false, 0.1, "V"),
    ReadingSpec::new(4002, "L3 Voltage", WordCount::One, false, 0.1, "V"),
    ReadingSpec::new(4024, "L1 Current", WordCount::One, false, 0.001, "A"),
    ReadingSpec::new(4025, "L2 Current", WordCount::One, false, 0.001, "A"),
    ReadingSpec::new(4026, "L3 Current", WordCount::One, false, 0.001, "A"),
    ReadingSpec::new(4027, "Neutral Current", WordCount::One, false, 0.001, "A"),
    ReadingSpec::new(4040, "L1 Frequency", WordCount::One, false, 0.01, "Hz"),
    ReadingSpec::new(4041, "L2 Frequency", WordCount::One, false, 0.01, "Hz"),
    ReadingSpec::new(4042, "L3 Frequency", WordCount::One, false, 0.01, "Hz"),
    ReadingSpec::new(4043, "L1 Power Factor", WordCount::One, true, 0.001, ""),
    ReadingSpec::new(4044, "L2 Power Factor", WordCount::One, true, 0.001, ""),
    ReadingSpec::new(4045, "L3 Power Factor", WordCount::One, true, 0.001, ""),
    ReadingSpec::new(4046, "Total Power Factor", WordCount::One, true, 0.001, ""),
    ReadingSpec::new(4140, "L1 Active Power", WordCount::Two, true, 0.001, "W"),
    ReadingSpec::new(4142, "L2 Active Power", WordCount::Two, true, 0.001, "W"),
    ReadingSpec::new(4144, "L3 Active Power", WordCount::Two, true, 0.001, "W"),
    ReadingSpec::new(4146, "Total Active Power", WordCount::Two, true, 0.001, "W"),
    ReadingSpec::new(4162, "L1 Reactive Power", WordCount::Two, true, 0.001, "Var"),
    ReadingSpec::new(4164, "L2 Reactive Power", WordCount::Two, true, 0.001, "Var"),
    ReadingSpec::new(4166, "L3 Reactive Power", WordCount::Two, true, 0.001, "Var"),
    ReadingSpec::new(4168, "Total Reactive Power", WordCount::Two, true, 0.001, "Var"),
    ReadingSpec::new(4184, "L1 Apparent Power", WordCount::Two, false, 0.001, "VA"),
    ReadingSpec::new(4186, "L2 Apparent Power", WordCount::Two, false, 0.001, "VA"),
    ReadingSpec::new(4188, "L3 Apparent Power", WordCount::Two, false, 0.001, "VA"),
    ReadingSpec::new(4190, "Total Apparent Power", WordCount::Two, false, 0.001, "VA"),
    ReadingSpec::new(
        4222,
        "Total Active Import Energy",
        WordCount::Four,
        false,
        1.0,
        "Wh",
    ),
    ReadingSpec::new(
        4238,
        "Total Active Export Energy",
        WordCount::Four,
        false,
        1.0,
        "Wh",
    ),
    ReadingSpec::new(
        4254,
        "Total Inductive Energy",
        WordCount::Four,
        false,
        1.0,
        "Varh",
    ),
    ReadingSpec::new(
        4270,
        "Total Capacitive Energy",
        WordCount::Four,
        false,
        1.0,
        "Varh",
    ),
    ReadingSpec::new(
        4292,
        "Total Apparent Energy",
        WordCount::Four,
        false,
        1.0,
        "VAh",
    ),
];

/// A contiguous run of readings fetched in one register burst.
#[derive(Debug, Clone)]
pub struct RegisterBlock {
    /// First protocol address of the burst.
    pub base: u16,
    /// Number of registers covered by the burst.
    pub count: u16,
    /// Readings decoded out of the burst, in address order.
    pub specs: Vec<&'static ReadingSpec>,
}

/// Group the register map into contiguous bursts.
///
/// Readings whose register ranges touch are fetched together so the meter
/// sees a handful of reads per cycle instead of one per reading.
pub fn read_blocks() -> Vec<RegisterBlock> {
    let mut blocks: Vec<RegisterBlock> = Vec::new();
    for spec in METER_REGISTERS {
        match blocks.last_mut() {
            Some(block) if block.base + block.count == spec.address => {
                block.count += spec.words.words();
                block.specs.push(spec);
            }
            _ => blocks.push(RegisterBlock {
                base: spec.address,
                count: spec.words.words(),
                specs: vec![spec],
            }),
        }
    }
    blocks
}

/// Verify the non-overlap invariant of the register map.
///
/// Returns an error naming the first pair of readings whose register
/// ranges collide. The map is static, so this is checked once when the
/// meter reader is constructed and by the test suite.
pub fn validate_register_map() -> anyhow::Result<()> {
    for (i, a) in METER_REGISTERS.iter().enumerate() {
        for b in &METER_REGISTERS[i + 1..] {
            let disjoint = a.end_address() <= b.address || b.end_address() <= a.address;
            if !disjoint {
                anyhow::bail!(
                    "Register ranges overlap: {} ({}..{}) and {} ({}..{})",
                    a.name,
                    a.address,
                    a.end_address(),
                    b.name,
                    b.address,
                    b.end_address()
                );
            }
        }
    }
    Ok(())
}
