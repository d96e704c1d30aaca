// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Meter protocol module
//!
//! Holds the static register map of the metering device, the word
//! decoder, the register link seam with its Modbus TCP implementation,
//! and a simulator used by tests and development setups. Only the
//! read-only register map used by the meter is covered; this is not a
//! general Modbus library.

pub mod client;
pub mod decode;
pub mod registers;
pub mod sim;

pub use client::{LinkError, MeterReader, RegisterLink, TcpRegisterLink};
pub use decode::{decode_reading, ReadingValue};
pub use registers::{read_blocks, validate_register_map, ReadingSpec, RegisterBlock, WordCount};
pub use sim::MeterSimulator;
