// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the generator monitor
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings for the generator monitor. The configuration is
//! backed by a YAML file and validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The application's configuration is organized as a nested structure with
//! sections:
//! - `acquisition`: Poll cycle cadence
//! - `modbus`: Modbus TCP meter link settings
//! - `generators`: Monitored generator channels and wiring polarity
//! - `storage`: Durable event/snapshot log settings
//!
//! ## Usage
//!
//! ```no_run
//! use rust_genmonitor::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("genmonitor.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(1000),                      // Poll interval in ms
//!     Some("192.168.1.50".to_string()), // Meter address
//!     Some(5020),                      // Meter port
//!     None,                            // Data directory
//! );
//!
//! // Access configuration values
//! println!("Meter port: {}", config.modbus.port);
//! ```

pub mod acquisition;
pub mod generators;
pub mod modbus;
pub mod storage;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use acquisition::AcquisitionConfig;
pub use generators::{GeneratorChannel, GeneratorsConfig};
pub use modbus::ModbusConfig;
pub use storage::StorageConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// Root configuration structure for the generator monitor.
///
/// This structure serves as the main container for all configuration
/// sections of the application.
///
/// # Structure
///
/// The configuration is designed to be deserialized from and serialized to
/// YAML using the serde framework. The structure is validated against a JSON
/// schema to ensure all required fields are present and have valid values.
///
/// # Default Values
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, allowing for minimal configuration when custom
/// settings are not required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Poll cycle settings.
    ///
    /// Controls whether the poll loop runs and at which cadence the
    /// generator lines and the meter are sampled.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Modbus TCP meter link settings.
    ///
    /// Controls the endpoint and timeout used when reading meter
    /// registers. If not specified, default values will be used.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Monitored generator channels.
    ///
    /// One entry per generator with its input line and polarity.
    /// If not specified, the reference three-generator wiring is used.
    #[serde(default)]
    pub generators: GeneratorsConfig,

    /// Durable storage settings.
    ///
    /// Controls where the event and snapshot logs live and how often a
    /// snapshot is durably persisted.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acquisition: AcquisitionConfig::default(),
            modbus: ModbusConfig::default(),
            generators: GeneratorsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        debug!("Creating sample configuration file at {:?}", path);
        let sample_path = path.with_extension("sample.yaml");

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                std::fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        let sample_config = Self::default();
        sample_config
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        // Load and validate with the schema
        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        // Create the validator
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        // Validate before deserializing to Config
        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            // We generate a config.sample.yaml file with the default values
            // for the user to edit
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        // Now that YAML has been validated, deserialize to Config
        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                match Self::create_sample_config(path) {
                    Ok(_) => debug!("Successfully created sample config"),
                    Err(e) => error!("Failed to create sample config: {}", e),
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        // Perform additional specific validations
        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values that are explicitly provided override the existing
    /// configuration.
    ///
    /// # Parameters
    ///
    /// * `interval_ms` - Poll cycle interval in milliseconds
    /// * `modbus_address` - Network address of the meter
    /// * `modbus_port` - TCP port of the meter
    /// * `data_dir` - Directory holding the durable logs
    pub fn apply_args(
        &mut self,
        interval_ms: Option<u64>,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
        data_dir: Option<PathBuf>,
    ) {
        if let Some(interval) = interval_ms {
            debug!("Overriding poll interval from command line: {}", interval);
            self.acquisition.interval_ms = interval;
        }

        if let Some(address) = modbus_address {
            debug!("Overriding meter address from command line: {}", address);
            self.modbus.address = address;
        }

        if let Some(port) = modbus_port {
            debug!("Overriding meter port from command line: {}", port);
            self.modbus.port = port;
        }

        if let Some(dir) = data_dir {
            debug!("Overriding data directory from command line: {:?}", dir);
            self.storage.data_dir = dir;
        }
    }
}
