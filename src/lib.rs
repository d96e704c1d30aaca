// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Generator fleet monitor library
//!
//! This library turns a set of digital generator run/stop lines and a
//! register-addressable energy meter into a durable, rate-limited telemetry
//! log and a reconstructed per-generator cumulative run-time ("engine hours").

pub mod acquisition;
pub mod config;
pub mod daemon;
pub mod hours;
pub mod modbus;
pub mod storage;
