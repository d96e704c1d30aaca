// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP meter link configuration
//!
//! This module defines the structures for configuring the Modbus TCP client
//! that reads the metering device.

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus TCP meter link.
///
/// This structure contains settings that control how the monitor connects
/// to the metering device, including the network endpoint, the unit
/// identifier and the per-request timeout.
///
/// # Fields
///
/// * `enabled` - Flag to enable or disable meter reads
/// * `address` - Network address of the meter (default: 127.0.0.1)
/// * `port` - TCP port of the meter (default: 502)
/// * `slave` - Modbus unit identifier of the meter (default: 1)
/// * `timeout_ms` - Per-request timeout in milliseconds (default: 1000)
///
/// # Example
///
/// ```
/// use rust_genmonitor::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     enabled: true,
///     address: "192.168.1.50".to_string(),
///     port: 502,
///     slave: 1,
///     timeout_ms: 1000,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Flag to enable or disable meter reads.
    ///
    /// When disabled, the poll loop still samples the run/stop lines but
    /// never opens a connection to the meter and produces no snapshots.
    pub enabled: bool,

    /// The network address of the meter.
    ///
    /// Can be an IPv4/IPv6 address or a hostname. Default is "127.0.0.1".
    pub address: String,

    /// The TCP port the meter listens on.
    ///
    /// Valid range is 1-65534. Default value is 502, the standard
    /// Modbus TCP port.
    pub port: u16,

    /// The Modbus unit identifier addressed on the link.
    pub slave: u8,

    /// Per-request timeout in milliseconds.
    ///
    /// A register read that does not complete within this window counts
    /// as a transport failure for the cycle. Must be greater than zero.
    pub timeout_ms: u64,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1".to_string(),
            port: 502,
            slave: 1,
            timeout_ms: 1000,
        }
    }
}
