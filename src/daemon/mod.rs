// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-genmonitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Daemon module
//!
//! Supervises the long-running tasks of the monitor.

pub mod launch_daemon;

pub use launch_daemon::Daemon;
