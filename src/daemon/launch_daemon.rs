// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Daemon supervisor
//!
//! Builds the monitoring components out of the configuration, owns their
//! task handles and drives graceful shutdown. Connections and stores are
//! acquired here at startup and released on shutdown; nothing holds
//! ambient global state.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time;

use crate::acquisition::{PollDaemon, SharedTelemetryStream, SimulatedSignalSource};
use crate::config::Config;
use crate::modbus::client::{MeterReader, TcpRegisterLink};
use crate::storage::JsonlStore;

/// Per-cycle flip probability of the simulated fleet.
const SIMULATED_FLIP_PROBABILITY: f64 = 0.02;

/// Represents a daemon task that can be started and managed
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    poll_running: Option<Arc<AtomicBool>>,
    telemetry_stream: Option<SharedTelemetryStream>,
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            poll_running: None,
            telemetry_stream: None,
        }
    }

    /// Launch all configured tasks based on configuration
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        // Start the poll loop if enabled
        if config.acquisition.enabled {
            self.start_poll_loop(config).await?;
        } else {
            warn!("Poll loop disabled in configuration, nothing to monitor");
        }

        // Start heartbeat task for monitoring
        self.start_heartbeat()?;

        Ok(())
    }

    /// Resolve the configured meter endpoint to a socket address.
    fn resolve_meter_addr(config: &Config) -> Result<SocketAddr> {
        let endpoint = format!("{}:{}", config.modbus.address, config.modbus.port);
        endpoint
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve meter endpoint {}", endpoint))?
            .next()
            .with_context(|| format!("Meter endpoint {} resolved to no address", endpoint))
    }

    /// Build the monitoring components and start the poll loop task.
    async fn start_poll_loop(&mut self, config: &Config) -> Result<()> {
        info!("Starting poll loop");

        let store = Arc::new(
            JsonlStore::open(&config.storage.data_dir)
                .with_context(|| format!("Failed to open store at {:?}", config.storage.data_dir))?,
        );

        let signals = Box::new(SimulatedSignalSource::new(
            &config.generators.channels,
            SIMULATED_FLIP_PROBABILITY,
        ));

        let meter = if config.modbus.enabled {
            let addr = Self::resolve_meter_addr(config)?;
            let timeout = Duration::from_millis(config.modbus.timeout_ms);
            let link = TcpRegisterLink::connect(addr, config.modbus.slave, timeout)
                .await
                .with_context(|| format!("Failed to connect to meter at {}", addr))?;
            info!("Connected to meter at {}", addr);
            Some(MeterReader::new(Box::new(link))?)
        } else {
            info!("Meter link disabled, monitoring signals only");
            None
        };

        let mut poll_daemon = PollDaemon::new(
            signals,
            meter,
            store.clone(),
            store,
            config.acquisition.interval_ms,
            config.storage.snapshot_min_interval_secs,
        );

        self.telemetry_stream = Some(poll_daemon.get_stream().clone());
        self.poll_running = Some(poll_daemon.running_flag());

        let task = tokio::spawn(async move { poll_daemon.start().await });
        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                debug!("Daemon heartbeat: running");
                time::sleep(Duration::from_secs(60)).await;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Get the live telemetry stream, when the poll loop is running.
    pub fn get_telemetry_stream(&self) -> Option<&SharedTelemetryStream> {
        self.telemetry_stream.as_ref()
    }

    /// Stop all running tasks
    ///
    /// The poll loop finishes its current cycle and releases the meter
    /// connection before exiting.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        if let Some(poll_running) = &self.poll_running {
            poll_running.store(false, Ordering::SeqCst);
        }
    }

    /// Wait for all tasks to complete
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Task failed: {:#}", e),
                Err(e) => log::error!("Task panicked: {}", e),
            }
        }
        Ok(())
    }
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}
