// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Meter simulator
//!
//! A small Modbus TCP server exposing the meter register map with
//! plausible values, used by the integration tests and for development
//! against no hardware. The simulated meter is read-only like the real
//! one: write requests are answered with an illegal-function exception.

use std::{
    collections::HashMap,
    future,
    sync::{Arc, Mutex},
};

use log::error;
use tokio_modbus::prelude::*;

use crate::modbus::registers::{ReadingSpec, WordCount, METER_REGISTERS};

/// Modbus service answering register reads from a shared register image.
pub struct MeterSimulator {
    registers: Arc<Mutex<HashMap<u16, u16>>>,
}

impl MeterSimulator {
    /// Create a simulator with a fresh default register image.
    pub fn new() -> Self {
        Self::with_registers(Arc::new(Mutex::new(default_register_image())))
    }

    /// Create a simulator over a shared register image.
    ///
    /// Every client connection gets its own service instance; sharing the
    /// image keeps all connections (and the jitter task) consistent.
    pub fn with_registers(registers: Arc<Mutex<HashMap<u16, u16>>>) -> Self {
        Self { registers }
    }
}

impl Default for MeterSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl tokio_modbus::server::Service for MeterSimulator {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let res = match req {
            Request::ReadHoldingRegisters(addr, cnt) => {
                register_read(&self.registers.lock().unwrap(), addr, cnt)
                    .map(Response::ReadHoldingRegisters)
            }
            Request::ReadInputRegisters(addr, cnt) => {
                register_read(&self.registers.lock().unwrap(), addr, cnt)
                    .map(Response::ReadInputRegisters)
            }
            _ => {
                error!("SIM: Exception::IllegalFunction - meter is read-only: {req:?}");
                Err(ExceptionCode::IllegalFunction)
            }
        };
        future::ready(res)
    }
}

/// Helper function implementing reading registers from a HashMap.
fn register_read(
    registers: &HashMap<u16, u16>,
    addr: u16,
    cnt: u16,
) -> Result<Vec<u16>, ExceptionCode> {
    let mut response_values = vec![0; cnt.into()];
    for i in 0..cnt {
        let reg_addr = addr + i;
        if let Some(r) = registers.get(&reg_addr) {
            response_values[i as usize] = *r;
        } else {
            error!("SIM: Exception::IllegalDataAddress at {}", reg_addr);
            return Err(ExceptionCode::IllegalDataAddress);
        }
    }

    Ok(response_values)
}

/// Write one reading's raw value into the image as big-word-first words.
pub fn store_raw(image: &mut HashMap<u16, u16>, spec: &ReadingSpec, raw: u64) {
    let words = spec.words.words() as u64;
    for i in 0..words {
        let shift = 16 * (words - 1 - i);
        image.insert(spec.address + i as u16, ((raw >> shift) & 0xFFFF) as u16);
    }
}

/// Read one reading's raw value back out of the image.
///
/// Registers missing from the image read as zero words.
pub fn load_raw(image: &HashMap<u16, u16>, spec: &ReadingSpec) -> u64 {
    let words = spec.words.words() as u64;
    let mut raw = 0u64;
    for i in 0..words {
        let word = image.get(&(spec.address + i as u16)).copied().unwrap_or(0);
        raw = (raw << 16) | word as u64;
    }
    raw
}

/// Default register image with plausible three-phase values.
pub fn default_register_image() -> HashMap<u16, u16> {
    let mut image = HashMap::new();
    for spec in METER_REGISTERS {
        let raw: u64 = match (spec.words, spec.unit) {
            (WordCount::One, "V") => 2315,   // 231.5 V
            (WordCount::One, "A") => 12_480, // 12.48 A
            (WordCount::One, "Hz") => 5001,  // 50.01 Hz
            (WordCount::One, _) => 978,      // power factor 0.978
            (WordCount::Two, _) => 8_640,    // watts-class magnitude
            (WordCount::Four, _) => 1_234_567_890, // energy counter
        };
        store_raw(&mut image, spec, raw);
    }
    image
}
