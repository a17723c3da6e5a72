// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observation records carried in framed messages from instrumented
//! processes to the daemon.
//!
//! These are the units the reservoirs accumulate. They deserialize straight
//! off the wire and are merged or sampled in-memory until the next harvest.

use serde::{Deserialize, Serialize};

/// A pre-shaped analytics or custom event.
///
/// The instrumentation library builds the final JSON shape; the daemon only
/// samples and forwards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalyticsEvent(pub serde_json::Value);

/// A single timed metric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Metric name, e.g. `Datastore/statement/MySQL/users/select`.
    pub name: String,
    /// Observed duration in microseconds.
    pub duration_us: u64,
    /// Duration exclusive of child operations, in microseconds.
    #[serde(default)]
    pub exclusive_us: u64,
}

/// A captured error occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Unix timestamp in milliseconds.
    pub when_ms: u64,
    /// Transaction the error occurred in.
    pub txn_name: String,
    /// Error message.
    pub message: String,
    /// Error class or category.
    pub class: String,
    /// Opaque attribute blob, forwarded verbatim.
    #[serde(default)]
    pub attributes: serde_json::Value,
}

/// A summarized slow operation, merged across occurrences with the same
/// identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowSample {
    /// Stable identifier for the statement (hash of the normalized query).
    pub id: u64,
    /// Occurrences folded into this record.
    pub count: u64,
    /// Cumulative duration in microseconds.
    pub total_us: u64,
    /// Minimum observed duration in microseconds.
    pub min_us: u64,
    /// Maximum observed duration in microseconds.
    pub max_us: u64,
    /// Derived metric name.
    pub metric_name: String,
    /// Literal query text.
    pub query: String,
    /// Transaction the sample was taken in.
    pub txn_name: String,
    /// Request URL of that transaction.
    pub txn_url: String,
    /// Opaque parameter blob (explain plan, backtrace, ...).
    #[serde(default)]
    pub params: serde_json::Value,
}

impl SlowSample {
    /// Fold `other` into `self`; both must carry the same identifier.
    ///
    /// Counts and totals add, min/max fold, and the descriptive fields
    /// (query, metric name, params, txn name/url) follow whichever record
    /// carried the new maximum: the reservoir keeps the metadata of the
    /// slowest seen instance only.
    pub fn merge(&mut self, other: SlowSample) {
        debug_assert_eq!(self.id, other.id);

        self.count += other.count;
        self.total_us += other.total_us;
        self.min_us = self.min_us.min(other.min_us);

        if other.max_us > self.max_us {
            self.max_us = other.max_us;
            self.metric_name = other.metric_name;
            self.query = other.query;
            self.txn_name = other.txn_name;
            self.txn_url = other.txn_url;
            self.params = other.params;
        }
    }
}

#[cfg(test)]
#[path = "observation_tests.rs"]
mod tests;
