// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Polling configuration
//!
//! This module defines the structures for configuring the poll cycle that
//! samples generator signals and reads the meter.

use serde::{Deserialize, Serialize};

/// Configuration for the poll cycle.
///
/// This structure contains settings that control how often the monitor
/// samples the generator run/stop lines and reads the meter registers,
/// and whether the poll loop is enabled at all.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AcquisitionConfig {
    /// Flag to enable or disable the poll loop.
    ///
    /// When enabled, the daemon will sample signals and read the meter
    /// at the specified interval. When disabled, nothing is polled.
    pub enabled: bool,

    /// Time interval in milliseconds between poll cycles.
    ///
    /// This parameter controls how frequently the system samples the
    /// run/stop lines and reads meter registers. Lower values detect
    /// transitions sooner but increase load on the meter link.
    /// Must be greater than zero.
    pub interval_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 2000, // Default to 2 seconds between cycles
        }
    }
}
