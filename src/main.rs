// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the generator fleet monitor
use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use rust_genmonitor::acquisition::GeneratorId;
use rust_genmonitor::config::{output_config_schema, Config};
use rust_genmonitor::daemon::Daemon;
use rust_genmonitor::hours::report_for_window;
use rust_genmonitor::storage::JsonlStore;

/// Generator fleet monitor with Modbus TCP energy metering
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "genmonitor.yaml")]
    config: PathBuf,

    /// Output the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Poll cycle interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Meter network address
    #[arg(long)]
    modbus_address: Option<String>,

    /// Meter TCP port
    #[arg(long)]
    modbus_port: Option<u16>,

    /// Directory holding the durable logs
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Print per-generator engine hours for the trailing window (in
    /// hours) and exit instead of starting the daemon
    #[arg(long, value_name = "HOURS")]
    report: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    let args = Args::parse();

    if args.show_config_schema {
        return output_config_schema();
    }

    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
    config.apply_args(
        args.interval_ms,
        args.modbus_address,
        args.modbus_port,
        args.data_dir,
    );

    if let Some(window_hours) = args.report {
        return print_report(&config, window_hours);
    }

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    daemon.shutdown();
    daemon.join().await?;

    Ok(())
}

/// Compute and print engine hours over the trailing window.
fn print_report(config: &Config, window_hours: u32) -> Result<()> {
    let store = JsonlStore::open(&config.storage.data_dir)
        .with_context(|| format!("Failed to open store at {:?}", config.storage.data_dir))?;

    let generators: Vec<GeneratorId> = config
        .generators
        .channels
        .iter()
        .map(|channel| GeneratorId(channel.id))
        .collect();

    let now = Utc::now();
    let from = now - ChronoDuration::hours(window_hours as i64);
    let report = report_for_window(&store, &generators, from, now, now)?;

    println!("Engine hours over the last {} hour(s):", window_hours);
    for entry in report {
        let label = config
            .generators
            .channels
            .iter()
            .find(|channel| channel.id == entry.generator.0)
            .and_then(|channel| channel.label.clone())
            .unwrap_or_else(|| format!("Generator {}", entry.generator.0));
        println!("{:<24}{}", label, entry.formatted());
    }

    Ok(())
}
