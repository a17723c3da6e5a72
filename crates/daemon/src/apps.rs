// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application table: identity → harvest state.
//!
//! The table has one mutex around insertion, lookup and eviction; the
//! per-observation hot path holds it only long enough to clone the entry
//! handle. Each entry has its own mutex covering its reservoirs and its
//! `last_activity` timestamp. No lock is ever held across an upload.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use beacon_core::{AnalyticsEvent, AppIdentity, ErrorEvent, Limits, MetricSample, SlowSample};
use beacon_harvest::{Harvest, Reservoir};
use parking_lot::Mutex;
use tokio::sync::Notify;
// tokio's Instant so that time-paused tests drive idle eviction.
use tokio::time::Instant;

/// One observation, dispatched by kind to the matching reservoir.
#[derive(Debug)]
pub enum Observation {
    Event(AnalyticsEvent),
    CustomEvent(AnalyticsEvent),
    Metric(MetricSample),
    Error(ErrorEvent),
    SlowSample(SlowSample),
}

/// Monotonic diagnostic counters for one entry.
#[derive(Debug, Default)]
pub struct AppStats {
    /// Observations ingested across the entry's lifetime.
    pub observations: AtomicU64,
    /// Harvest ticks run.
    pub harvests: AtomicU64,
    /// Reduced payloads discarded after upload failure.
    pub payloads_dropped: AtomicU64,
}

/// Mutable state behind the entry lock.
#[derive(Debug)]
struct AppState {
    harvest: Harvest,
    last_activity: Instant,
    /// Token issued by the ingest service; `None` means disconnected and
    /// the next connect frame re-runs the handshake.
    run_token: Option<String>,
}

/// Per-identity state accumulating observations between uploads.
#[derive(Debug)]
pub struct AppEntry {
    pub identity: AppIdentity,
    state: Mutex<AppState>,
    /// Kill switches of the entry's open connections. Weak: presence is
    /// not ownership; a closed connection is simply pruned.
    connections: Mutex<Vec<Weak<Notify>>>,
    pub stats: AppStats,
}

impl AppEntry {
    fn new(identity: AppIdentity, limits: &Limits) -> Self {
        Self {
            identity,
            state: Mutex::new(AppState {
                harvest: Harvest::new(limits),
                last_activity: Instant::now(),
                run_token: None,
            }),
            connections: Mutex::new(Vec::new()),
            stats: AppStats::default(),
        }
    }

    /// Merge one observation into the matching reservoir.
    pub fn ingest(&self, observation: Observation) {
        let mut state = self.state.lock();
        state.last_activity = Instant::now();
        match observation {
            Observation::Event(e) => state.harvest.events.observe(e),
            Observation::CustomEvent(e) => state.harvest.custom_events.observe(e),
            Observation::Metric(s) => state.harvest.metrics.observe(s),
            Observation::Error(e) => state.harvest.errors.observe(e),
            Observation::SlowSample(s) => state.harvest.slow_samples.observe(s),
        }
        self.stats.observations.fetch_add(1, Ordering::Relaxed);
    }

    /// Swap the reservoir bundle for an empty one, returning the retired
    /// bundle and the current run token.
    ///
    /// This is the only synchronization point between ingest and harvest.
    pub fn swap_harvest(&self) -> (Harvest, Option<String>) {
        let mut state = self.state.lock();
        let retired = state.harvest.swap_out();
        (retired, state.run_token.clone())
    }

    pub fn run_token(&self) -> Option<String> {
        self.state.lock().run_token.clone()
    }

    /// Install or clear the run token. Clearing marks the entry
    /// disconnected; the next connect frame re-runs the handshake.
    pub fn set_run_token(&self, token: Option<String>) {
        self.state.lock().run_token = token;
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().run_token.is_some()
    }

    /// Time since the last ingested observation (or entry creation).
    pub fn idle_for(&self) -> Duration {
        self.state.lock().last_activity.elapsed()
    }

    /// Register a connection's kill switch with this entry.
    pub fn register_connection(&self, kill: &Arc<Notify>) {
        let mut connections = self.connections.lock();
        connections.retain(|weak| weak.strong_count() > 0);
        connections.push(Arc::downgrade(kill));
    }

    /// Close every open connection of this entry (used on eviction).
    pub fn close_connections(&self) {
        let mut connections = self.connections.lock();
        for weak in connections.drain(..) {
            if let Some(kill) = weak.upgrade() {
                kill.notify_one();
            }
        }
    }

    /// Number of live registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

/// Mapping from application identity to entry.
#[derive(Debug)]
pub struct AppTable {
    limits: Limits,
    entries: Mutex<HashMap<AppIdentity, Arc<AppEntry>>>,
}

impl AppTable {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up or create the entry for an identity. Returns the handle and
    /// whether it was just created.
    pub fn attach(&self, identity: &AppIdentity) -> (Arc<AppEntry>, bool) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(identity) {
            return (Arc::clone(entry), false);
        }
        let entry = Arc::new(AppEntry::new(identity.clone(), &self.limits));
        entries.insert(identity.clone(), Arc::clone(&entry));
        (entry, true)
    }

    pub fn get(&self, identity: &AppIdentity) -> Option<Arc<AppEntry>> {
        self.entries.lock().get(identity).cloned()
    }

    /// Remove an entry, returning its handle for a final harvest.
    pub fn remove(&self, identity: &AppIdentity) -> Option<Arc<AppEntry>> {
        self.entries.lock().remove(identity)
    }

    /// Snapshot of all current entries.
    pub fn entries(&self) -> Vec<Arc<AppEntry>> {
        self.entries.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "apps_tests.rs"]
mod tests;
