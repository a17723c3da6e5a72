// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harvest scheduler.
//!
//! Each application entry is driven by its own periodic tick: swap the
//! reservoirs, reduce the retired bundle, upload the payloads sequentially
//! in fixed order, and fold the outcome. All outcomes discard the reduced
//! payloads; the cost of memory-bounded behaviour is that a failed harvest
//! is simply lost. Cross-application harvests run concurrently; within one
//! application the reservoir swap is the only synchronization with ingest.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::apps::{AppEntry, AppTable};
use crate::collector::{Ingest, UploadOutcome};

/// Settings for the per-entry harvest loops.
#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    /// Period of the harvest tick.
    pub cycle: Duration,
    /// Idle window after which an entry is destroyed.
    pub app_timeout: Duration,
    /// Build slow-sample payloads uncompressed (audit variant).
    pub audit: bool,
}

/// Drive one application entry until shutdown or idle eviction.
///
/// Spawned when the entry is created. A shutdown signal ends the loop
/// without a harvest; the worker runs one forced final harvest per entry
/// afterwards.
pub async fn run_entry<I: Ingest>(
    entry: Arc<AppEntry>,
    table: Arc<AppTable>,
    ingest: Arc<I>,
    config: HarvesterConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.cycle);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; the first harvest should not.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let idle = entry.idle_for() > config.app_timeout;
                harvest_entry(&entry, ingest.as_ref(), config.audit).await;
                if idle {
                    info!(app = entry.identity.display_name(), "evicting idle application");
                    table.remove(&entry.identity);
                    entry.close_connections();
                    return;
                }
            }
            _ = shutdown.changed() => return,
        }
    }
}

/// One harvest tick: swap, reduce, upload, fold failure.
pub async fn harvest_entry<I: Ingest>(entry: &AppEntry, ingest: &I, audit: bool) {
    let (retired, run_token) = entry.swap_harvest();
    entry.stats.harvests.fetch_add(1, Ordering::Relaxed);

    if retired.is_empty() {
        return;
    }

    let payloads = match retired.reduce(audit) {
        Ok(payloads) => payloads,
        Err(e) => {
            warn!(app = entry.identity.display_name(), "payload reduction failed: {e}");
            return;
        }
    };

    let Some(run_token) = run_token else {
        debug!(
            app = entry.identity.display_name(),
            "entry disconnected; discarding {} payloads",
            payloads.len()
        );
        entry
            .stats
            .payloads_dropped
            .fetch_add(payloads.len() as u64, Ordering::Relaxed);
        return;
    };

    // Sequential per entry, in the bundle's fixed order: a failure of a
    // later payload never invalidates an earlier success.
    let mut remaining = payloads.len() as u64;
    for payload in &payloads {
        remaining -= 1;
        match ingest.upload(&run_token, payload).await {
            UploadOutcome::Accepted => {}
            UploadOutcome::RetryLater => {
                warn!(
                    app = entry.identity.display_name(),
                    kind = payload.kind.endpoint(),
                    "ingest unavailable; payload discarded"
                );
                entry.stats.payloads_dropped.fetch_add(1, Ordering::Relaxed);
            }
            UploadOutcome::RejectedPermanent => {
                warn!(
                    app = entry.identity.display_name(),
                    kind = payload.kind.endpoint(),
                    "ingest rejected payload; disconnecting entry"
                );
                entry
                    .stats
                    .payloads_dropped
                    .fetch_add(1 + remaining, Ordering::Relaxed);
                entry.set_run_token(None);
                entry.close_connections();
                return;
            }
        }
    }
}

/// Force one final harvest for every entry; run at shutdown after the
/// listener has stopped and in-flight reads have drained.
pub async fn final_sweep<I: Ingest>(table: &AppTable, ingest: &I, audit: bool) {
    for entry in table.entries() {
        harvest_entry(&entry, ingest, audit).await;
    }
}

#[cfg(test)]
#[path = "harvester_tests.rs"]
mod tests;
