// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests for configuration loading and validation
//!
//! These tests exercise the full load path: default creation when the
//! file is missing, YAML round-trips, schema validation failures and the
//! sample file generated alongside a rejected configuration.

use std::fs;
use std::path::PathBuf;

use rust_genmonitor::config::Config;

fn temp_config_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("genmonitor.yaml")
}

#[test]
fn missing_file_creates_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_config_path(&dir);

    let config = Config::from_file(&path).unwrap();
    assert!(path.exists(), "default file should be written");
    assert_eq!(config.acquisition.interval_ms, 2000);
    assert_eq!(config.modbus.port, 502);
    assert_eq!(config.generators.channels.len(), 3);
    assert_eq!(config.storage.snapshot_min_interval_secs, 600);
}

#[test]
fn saved_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_config_path(&dir);

    let mut config = Config::default();
    config.acquisition.interval_ms = 500;
    config.modbus.address = "192.168.1.50".to_string();
    config.save_to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.acquisition.interval_ms, 500);
    assert_eq!(loaded.modbus.address, "192.168.1.50");
}

#[test]
fn unknown_keys_fail_schema_validation_and_produce_sample() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_config_path(&dir);

    fs::write(&path, "acquisition:\n  enabled: true\nmystery_section: 1\n").unwrap();

    let result = Config::from_file(&path);
    assert!(result.is_err());

    let sample = path.with_extension("sample.yaml");
    assert!(sample.exists(), "sample config should be generated");
}

#[test]
fn zero_interval_fails_schema_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_config_path(&dir);

    fs::write(&path, "acquisition:\n  enabled: true\n  interval_ms: 0\n").unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn duplicate_generator_ids_fail_specific_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_config_path(&dir);

    fs::write(
        &path,
        concat!(
            "generators:\n",
            "  channels:\n",
            "    - id: 1\n",
            "      pin: 17\n",
            "    - id: 1\n",
            "      pin: 27\n",
        ),
    )
    .unwrap();

    let result = Config::from_file(&path);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Duplicate"));
}

#[test]
fn polarity_defaults_to_active_low() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_config_path(&dir);

    fs::write(
        &path,
        concat!(
            "generators:\n",
            "  channels:\n",
            "    - id: 1\n",
            "      pin: 17\n",
        ),
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert!(config.generators.channels[0].active_low);
}
