// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Standalone meter simulator
//!
//! Serves the meter register map over Modbus TCP with gently wandering
//! values so the monitor can be exercised without hardware.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use log::info;
use rand::Rng;
use tokio::net::TcpListener;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use rust_genmonitor::modbus::registers::{WordCount, METER_REGISTERS};
use rust_genmonitor::modbus::sim::{default_register_image, load_raw, store_raw, MeterSimulator};

/// Modbus TCP meter simulator for the generator monitor
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Port to listen on
    #[clap(long, default_value = "5020")]
    port: u16,

    /// Seconds between value updates (0 disables wandering)
    #[clap(long, default_value = "2")]
    jitter_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    let args = Args::parse();

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;
    let listener = TcpListener::bind(socket_addr).await?;
    let socket_addr = listener.local_addr()?;
    info!("Meter simulator listening on {}", socket_addr);

    let registers = Arc::new(Mutex::new(default_register_image()));

    if args.jitter_secs > 0 {
        let jitter_registers = registers.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(args.jitter_secs));
            loop {
                ticker.tick().await;
                wander(&jitter_registers);
            }
        });
    }

    let server = Server::new(listener);
    let on_connected = move |stream, peer| {
        let registers = registers.clone();
        async move {
            accept_tcp_connection(stream, peer, move |_peer| {
                Ok(Some(MeterSimulator::with_registers(registers.clone())))
            })
        }
    };
    let on_process_error = |err| {
        log::error!("Server error: {}", err);
    };
    server.serve(&on_connected, on_process_error).await?;

    Ok(())
}

/// Nudge every reading a little; counters only ever grow.
fn wander(registers: &Arc<Mutex<HashMap<u16, u16>>>) {
    let mut image = registers.lock().unwrap();
    let mut rng = rand::rng();
    for spec in METER_REGISTERS {
        let raw = load_raw(&image, spec) as i64;
        let next = match spec.words {
            WordCount::One => (raw + rng.random_range(-3..=3)).clamp(0, u16::MAX as i64),
            WordCount::Two => (raw + rng.random_range(-50..=50)).max(0),
            WordCount::Four => raw + rng.random_range(0..=5),
        };
        store_raw(&mut image, spec, next as u64);
    }
}
