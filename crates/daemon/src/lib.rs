// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! beacon-daemon: the telemetry relay daemon (`beacond`).
//!
//! Architecture:
//! - Supervision chain: progenitor re-executes itself as a session-detached
//!   watcher; the watcher spawns and respawns the worker.
//! - Worker: listener task accepting framed observations, an application
//!   table, and one harvest loop per application entry.

pub mod apps;
pub mod collector;
pub mod config;
pub mod env;
pub mod facts;
pub mod harvester;
pub mod lifecycle;
pub mod listener;
pub mod logging;
pub mod pidfile;
pub mod protocol;
pub mod protocol_wire;
pub mod signals;
pub mod supervise;
