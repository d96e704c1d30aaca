// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;

use super::Config;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// # Example
///
/// ```bash
/// ./rust_genmonitor --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    // Load the schema from the embedded string
    let schema_str = include_str!("../../resources/config.schema.json");

    // Parse the schema to a JSON Value to pretty-format it
    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
///
/// # Arguments
///
/// * `addr` - The address string to validate
///
/// # Returns
///
/// `true` if the address is valid, `false` otherwise
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered
/// by the JSON schema.
///
/// This function performs deeper validation checks that can't be easily
/// expressed in a JSON schema, such as uniqueness of generator identifiers
/// and input lines across the fleet.
///
/// # Arguments
///
/// * `config` - The configuration object to validate
///
/// # Returns
///
/// * `Ok(())` if all validations pass
/// * `Err(anyhow::Error)` with descriptive message if any validation fails
///
/// # Validation Rules
///
/// This function validates:
///
/// - **Poll cadence**: the poll interval must be greater than zero
/// - **Port Range**: the meter port must be within a valid range (1-65534)
/// - **Address Format**: the meter address must be a valid IP address,
///   hostname special value, or resolvable name
/// - **Generator fleet**: generator ids and input lines must be unique and
///   ids must be non-zero
/// - **Snapshot sampling**: the snapshot interval must be greater than zero
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.acquisition.interval_ms == 0 {
        anyhow::bail!("Poll interval must be greater than zero");
    }

    if config.modbus.port < 1 {
        anyhow::bail!("Invalid meter port number: {}", config.modbus.port);
    }

    if !is_valid_ip_address(&config.modbus.address) {
        anyhow::bail!("Invalid meter address: {}", config.modbus.address);
    }

    if config.modbus.timeout_ms == 0 {
        anyhow::bail!("Meter timeout must be greater than zero");
    }

    if config.generators.channels.is_empty() {
        anyhow::bail!("At least one generator channel must be configured");
    }

    let mut seen_ids = HashSet::new();
    let mut seen_pins = HashSet::new();
    for channel in &config.generators.channels {
        if channel.id == 0 {
            anyhow::bail!("Generator id 0 is reserved; ids start at 1");
        }
        if !seen_ids.insert(channel.id) {
            anyhow::bail!("Duplicate generator id: {}", channel.id);
        }
        if !seen_pins.insert(channel.pin) {
            anyhow::bail!(
                "Input line {} is wired to more than one generator",
                channel.pin
            );
        }
    }

    if config.storage.snapshot_min_interval_secs == 0 {
        anyhow::bail!("Snapshot interval must be greater than zero");
    }

    Ok(())
}
