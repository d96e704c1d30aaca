// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Meter link and reader
//!
//! The [`RegisterLink`] trait is the seam between the monitor and the wire
//! protocol: anything that can fetch a run of 16-bit registers can serve
//! as a meter. [`TcpRegisterLink`] is the production implementation over
//! Modbus TCP; tests substitute scripted links.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use crate::acquisition::stream::TelemetrySnapshot;
use crate::modbus::registers::{read_blocks, validate_register_map, RegisterBlock};

/// Failure modes of a register read.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The transport failed or the request timed out.
    #[error("register link transport failure: {0}")]
    Transport(String),
    /// The meter answered with a protocol exception.
    #[error("meter returned exception: {0}")]
    Exception(String),
}

/// A device exposing 16-bit registers over some wire protocol.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegisterLink: Send {
    /// Read `count` consecutive registers starting at `address`.
    ///
    /// A successful response may legitimately carry fewer words than
    /// requested; the decoder treats the missing tail as unavailable.
    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, LinkError>;

    /// Release the underlying connection.
    async fn close(&mut self) -> Result<(), LinkError>;
}

/// Modbus TCP implementation of [`RegisterLink`].
pub struct TcpRegisterLink {
    ctx: Context,
    timeout: Duration,
}

impl TcpRegisterLink {
    /// Connect to the meter at `addr`, addressing unit `slave`.
    pub async fn connect(addr: SocketAddr, slave: u8, timeout: Duration) -> Result<Self, LinkError> {
        debug!("Connecting to meter at {} (unit {})", addr, slave);
        let ctx = tcp::connect_slave(addr, Slave(slave))
            .await
            .map_err(|e| LinkError::Transport(e.to_string()))?;
        Ok(Self { ctx, timeout })
    }
}

#[async_trait]
impl RegisterLink for TcpRegisterLink {
    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, LinkError> {
        let read = self.ctx.read_holding_registers(address, count);
        let response = tokio::time::timeout(self.timeout, read)
            .await
            .map_err(|_| LinkError::Transport(format!("read of {} timed out", address)))?;
        response
            .map_err(|e| LinkError::Transport(e.to_string()))?
            .map_err(|e| LinkError::Exception(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.ctx
            .disconnect()
            .await
            .map_err(|e| LinkError::Transport(e.to_string()))
    }
}

/// Reads and decodes full meter snapshots over a [`RegisterLink`].
pub struct MeterReader {
    link: Box<dyn RegisterLink>,
    blocks: Vec<RegisterBlock>,
}

impl MeterReader {
    /// Create a reader over the given link.
    ///
    /// The register map invariant is checked here once so a broken map
    /// edit fails at startup instead of corrupting decoded values.
    pub fn new(link: Box<dyn RegisterLink>) -> anyhow::Result<Self> {
        validate_register_map()?;
        Ok(Self {
            link,
            blocks: read_blocks(),
        })
    }

    /// Read every register burst and decode a telemetry snapshot.
    ///
    /// A transport failure or meter exception on any burst abandons the
    /// snapshot for this cycle. A burst that comes back short only marks
    /// its own readings unavailable.
    pub async fn read_snapshot(&mut self) -> Result<TelemetrySnapshot, LinkError> {
        let mut readings = BTreeMap::new();
        for block in &self.blocks {
            let words = self.link.read_registers(block.base, block.count).await?;
            if words.len() < block.count as usize {
                warn!(
                    "Short burst at {}: {} of {} words",
                    block.base,
                    words.len(),
                    block.count
                );
            }
            for spec in &block.specs {
                let offset = (spec.address - block.base) as usize;
                let value = super::decode::decode_reading(&words, offset, spec);
                readings.insert(spec.name.to_string(), value);
            }
        }
        Ok(TelemetrySnapshot::new(readings))
    }

    /// Release the underlying link.
    pub async fn close(&mut self) -> Result<(), LinkError> {
        self.link.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::decode::ReadingValue;
    use crate::modbus::registers::METER_REGISTERS;

    fn scripted_link() -> MockRegisterLink {
        let mut link = MockRegisterLink::new();
        link.expect_read_registers()
            .returning(|_, count| Ok(vec![0; count as usize]));
        link.expect_close().returning(|| Ok(()));
        link
    }

    #[tokio::test]
    async fn snapshot_covers_every_reading() {
        let mut reader = MeterReader::new(Box::new(scripted_link())).unwrap();
        let snapshot = reader.read_snapshot().await.unwrap();
        assert_eq!(snapshot.readings.len(), METER_REGISTERS.len());
        assert!(snapshot.readings.values().all(|v| !v.is_unavailable()));
    }

    #[tokio::test]
    async fn transport_failure_abandons_snapshot() {
        let mut link = MockRegisterLink::new();
        link.expect_read_registers()
            .returning(|_, _| Err(LinkError::Transport("connection reset".into())));
        let mut reader = MeterReader::new(Box::new(link)).unwrap();
        assert!(reader.read_snapshot().await.is_err());
    }

    #[tokio::test]
    async fn short_burst_marks_tail_unavailable() {
        let mut link = MockRegisterLink::new();
        // Every burst comes back one word short.
        link.expect_read_registers()
            .returning(|_, count| Ok(vec![0; count as usize - 1]));
        let mut reader = MeterReader::new(Box::new(link)).unwrap();
        let snapshot = reader.read_snapshot().await.unwrap();

        // The last reading of each burst is unavailable, the rest decode.
        assert_eq!(
            snapshot.readings["L3 Voltage"],
            ReadingValue::Unavailable
        );
        assert_eq!(
            snapshot.readings["L1 Voltage"],
            ReadingValue::Text("0.00".to_string())
        );
    }
}
