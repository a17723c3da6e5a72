// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local wire protocol between instrumented processes and the daemon.
//!
//! Messages travel as length-prefixed JSON (see `protocol_wire`). A
//! connection carries one connect frame followed by observation frames.

use beacon_core::{AnalyticsEvent, AppIdentity, ErrorEvent, MetricSample, SlowSample};
use serde::{Deserialize, Serialize};

/// A framed message from an instrumented process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Frame {
    /// Application handshake; must be the first frame on a connection.
    Connect { identity: AppIdentity },

    /// An analytics event.
    Event { event: AnalyticsEvent },

    /// A custom event.
    CustomEvent { event: AnalyticsEvent },

    /// A timed metric sample.
    Metric { sample: MetricSample },

    /// A captured error.
    Error { error: ErrorEvent },

    /// A slow-operation record.
    SlowSample { sample: SlowSample },
}

/// Daemon reply to a connect frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Reply {
    /// Connection accepted; the token identifies the application run on
    /// every upload.
    Accepted { run_token: String },

    /// Connection rejected; the library should not retry blindly.
    Rejected { reason: RejectReason },
}

/// Why a connect frame was rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum RejectReason {
    /// License key is malformed or unknown to the ingest service.
    InvalidLicense,

    /// Application and daemon disagree on high-security mode.
    HighSecurityMismatch,

    /// The ingest service redirected this application elsewhere.
    Redirect { host: String },
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
