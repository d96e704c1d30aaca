// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Generator channel configuration
//!
//! This module defines the structures describing the monitored generator
//! fleet: which input line each generator is wired to and with which
//! polarity. Wiring differs per installation, so none of this is
//! hard-coded in the monitor itself.

use serde::{Deserialize, Serialize};

/// Configuration for a single monitored generator.
///
/// # Fields
///
/// * `id` - Numeric generator identifier, unique within the fleet
/// * `pin` - Digital input line the run/stop signal is wired to
/// * `active_low` - Line polarity; when true the line reads high while the
///   unit is stopped
/// * `label` - Optional display name for reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorChannel {
    /// Numeric identifier of the generator (1..N).
    pub id: u8,

    /// Digital input line number the run signal is wired to.
    pub pin: u8,

    /// Line polarity.
    ///
    /// The observed wiring is active-low: the line reads true while the
    /// unit is stopped, so the sampled level must be inverted before it
    /// is compared against the persisted on/off state. Installations
    /// with active-high wiring set this to false.
    #[serde(default = "default_active_low")]
    pub active_low: bool,

    /// Optional display name used by reports.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_active_low() -> bool {
    true
}

/// Configuration for the monitored generator fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorsConfig {
    /// One entry per monitored generator.
    pub channels: Vec<GeneratorChannel>,
}

impl Default for GeneratorsConfig {
    fn default() -> Self {
        // The reference installation: three generators on lines 17, 27
        // and 22, all wired active-low.
        Self {
            channels: vec![
                GeneratorChannel {
                    id: 1,
                    pin: 17,
                    active_low: true,
                    label: None,
                },
                GeneratorChannel {
                    id: 2,
                    pin: 27,
                    active_low: true,
                    label: None,
                },
                GeneratorChannel {
                    id: 3,
                    pin: 22,
                    active_low: true,
                    label: None,
                },
            ],
        }
    }
}
