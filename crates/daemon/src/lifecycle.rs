// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle: startup, serving, orderly drain.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::apps::AppTable;
use crate::collector::{Collector, UploadError};
use crate::config::Config;
use crate::harvester::{self, HarvesterConfig};
use crate::listener::{self, Acceptor, ListenCtx, ListenError, Listener};
use crate::logging::LogHandle;
use crate::pidfile::{Pidfile, PidfileError};
use crate::signals::{self, SignalMsg};

/// Grace period for in-flight connection reads after the listener stops.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Another daemon holds the PID-file lock; the caller exits 0.
    #[error("another daemon is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Pidfile(PidfileError),

    #[error(transparent)]
    Listen(#[from] ListenError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Create and write the PID file, when one is configured.
///
/// `AlreadyRunning` means another daemon holds the lock; callers treat it
/// as success and exit 0.
pub fn acquire_pidfile(config: &Config) -> Result<Option<Pidfile>, LifecycleError> {
    let Some(path) = &config.pidfile else {
        return Ok(None);
    };
    if path.as_os_str().is_empty() {
        return Ok(None);
    }

    match Pidfile::create(path) {
        Ok(mut pidfile) => {
            pidfile.write().map_err(LifecycleError::Pidfile)?;
            Ok(Some(pidfile))
        }
        Err(PidfileError::AlreadyLocked(_)) => Err(LifecycleError::AlreadyRunning),
        Err(e) => Err(LifecycleError::Pidfile(e)),
    }
}

/// Raise the open-file soft limit when configured; best-effort.
fn apply_rlimit(limit: Option<u64>) {
    let Some(limit) = limit else { return };
    if let Err(e) = nix::sys::resource::setrlimit(nix::sys::resource::Resource::RLIMIT_NOFILE, limit, limit)
    {
        warn!(limit, "cannot raise open-file limit: {e}");
    }
}

/// Run the worker until signalled.
///
/// `own_pidfile` is set for a foreground worker; a worker spawned by a
/// watcher skips acquisition because its supervisor holds the lock.
pub async fn serve(
    config: Config,
    log: Option<LogHandle>,
    own_pidfile: bool,
) -> Result<(), LifecycleError> {
    apply_rlimit(config.rlimit_files);

    let pidfile = if own_pidfile {
        acquire_pidfile(&config)?
    } else {
        None
    };

    let bind = listener::parse_addr(&config.addr);
    let acceptor = Acceptor::bind(&bind).await?;

    let table = Arc::new(AppTable::new(config.limits));
    let ingest = Arc::new(Collector::new(&config)?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let harvester_config = HarvesterConfig {
        cycle: config.harvest_cycle,
        app_timeout: config.app_timeout,
        audit: config.auditlog.is_some(),
    };
    let ctx = Arc::new(ListenCtx {
        table: Arc::clone(&table),
        ingest: Arc::clone(&ingest),
        harvester: harvester_config.clone(),
        high_security: config.high_security,
        shutdown: shutdown_rx,
    });
    let mut listener_task = tokio::spawn(Listener::new(acceptor, ctx).run());

    let mut signal_rx = signals::spawn_dispatcher()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %bind,
        "daemon ready"
    );

    loop {
        tokio::select! {
            msg = signal_rx.recv() => match msg {
                Some(SignalMsg::Shutdown) | None => {
                    info!("shutdown requested");
                    break;
                }
                Some(SignalMsg::ReopenLog) => {
                    if let Some(log) = &log {
                        log.reopen();
                    }
                }
            },
            // The listener only returns on shutdown or a dead socket;
            // either way the worker is done serving.
            _ = &mut listener_task => {
                warn!("listener stopped; shutting down");
                break;
            }
        }
    }

    // Orderly drain: stop accepting, let in-flight reads finish, then one
    // final harvest per entry.
    let _ = shutdown_tx.send(true);
    tokio::time::sleep(DRAIN_GRACE).await;
    harvester::final_sweep(table.as_ref(), ingest.as_ref(), harvester_config.audit).await;
    listener_task.abort();

    if let listener::BindAddr::Unix(path) = &bind {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), "failed to remove socket file: {e}");
        }
    }
    if let Some(pidfile) = pidfile {
        pidfile.remove();
    }
    info!("daemon stopped");
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
