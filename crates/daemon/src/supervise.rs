// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervision tree: progenitor → watcher → worker.
//!
//! The progenitor re-executes itself with the role set to watcher and
//! exits; the watcher detaches into its own session, acquires the PID
//! file, and respawns the worker whenever it crashes. A terminating signal
//! received by the watcher is forwarded to the worker; the watcher exits
//! once the worker is reaped.

use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use beacon_core::{ExitStatus, Role};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use crate::config::Config;
use crate::env;
use crate::lifecycle::{self, LifecycleError};

/// Delay before respawning a crashed worker, so repeated crashes cannot
/// turn into a tight spawn loop.
pub const RESPAWN_DELAY: Duration = Duration::from_secs(1);

/// Supervision errors.
#[derive(Debug, Error)]
pub enum SuperviseError {
    #[error("cannot resolve daemon executable: {0}")]
    Executable(#[source] std::io::Error),

    #[error("cannot spawn daemon process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Pipe creation returned EBADF: a kernel too old for the modern pipe
    /// syscall.
    #[error("this OS is not supported (kernel lacks pipe2)")]
    UnsupportedOs,

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Absolute path to this executable, resolved before any `chdir("/")` so
/// re-exec keeps working from the new working directory.
fn daemon_executable() -> Result<PathBuf, SuperviseError> {
    let exe = std::env::current_exe().map_err(SuperviseError::Executable)?;
    exe.canonicalize().map_err(SuperviseError::Executable)
}

/// Progenitor: spawn the watcher with identical arguments and exit.
pub fn spawn_watcher() -> Result<(), SuperviseError> {
    let exe = daemon_executable()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (role_key, role_value) = env::respawn_env(Role::Watcher);

    let result = Command::new(&exe)
        .args(&args)
        .env(role_key, role_value)
        .current_dir("/")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match result {
        // The watcher detaches itself with setsid(); nothing to wait for.
        Ok(_child) => Ok(()),
        Err(e) if e.raw_os_error() == Some(nix::errno::Errno::EBADF as i32) => {
            Err(SuperviseError::UnsupportedOs)
        }
        Err(e) => Err(SuperviseError::Spawn(e)),
    }
}

/// Watcher: own the PID file and keep a worker alive.
///
/// Returns the watcher's exit code. A worker that exits with a code
/// terminates the watcher with that code; a worker killed by a signal is
/// respawned after [`RESPAWN_DELAY`].
pub async fn run_watcher(config: &Config, exit: &ExitStatus) -> Result<i32, SuperviseError> {
    let pidfile = match lifecycle::acquire_pidfile(config) {
        Ok(pidfile) => pidfile,
        // Another daemon is live; that is success.
        Err(LifecycleError::AlreadyRunning) => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let exe = daemon_executable()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (role_key, role_value) = env::respawn_env(Role::Worker);

    let mut sigterm = signal(SignalKind::terminate()).map_err(SuperviseError::Spawn)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(SuperviseError::Spawn)?;

    let code = loop {
        let mut child = tokio::process::Command::new(&exe)
            .args(&args)
            .env(role_key, role_value)
            .spawn()
            .map_err(SuperviseError::Spawn)?;
        let child_pid = child.id();
        info!(pid = child_pid, "worker spawned");

        let status = tokio::select! {
            status = child.wait() => status.map_err(SuperviseError::Spawn)?,
            forwarded = term_signal(&mut sigterm, &mut sigint) => {
                if let Some(pid) = child_pid {
                    info!(pid, signal = forwarded.as_str(), "forwarding signal to worker");
                    let _ = kill(Pid::from_raw(pid as i32), forwarded);
                }
                child.wait().await.map_err(SuperviseError::Spawn)?
            }
        };

        match classify(status) {
            WorkerExit::Graceful(code) => {
                info!(code, "worker exited; watcher following");
                break code;
            }
            WorkerExit::Crashed(sig) => {
                warn!(signal = sig, "worker crashed; respawning after delay");
                tokio::time::sleep(RESPAWN_DELAY).await;
            }
        }
    };

    if let Some(pidfile) = pidfile {
        pidfile.remove();
    }
    exit.raise(code);
    Ok(code)
}

/// How a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerExit {
    /// Exited with a code; the watcher follows with the same code.
    Graceful(i32),
    /// Killed by a signal; the watcher respawns.
    Crashed(Option<i32>),
}

fn classify(status: std::process::ExitStatus) -> WorkerExit {
    match status.code() {
        Some(code) => WorkerExit::Graceful(code),
        None => WorkerExit::Crashed(status.signal()),
    }
}

async fn term_signal(
    sigterm: &mut tokio::signal::unix::Signal,
    sigint: &mut tokio::signal::unix::Signal,
) -> Signal {
    tokio::select! {
        _ = sigterm.recv() => Signal::SIGTERM,
        _ = sigint.recv() => Signal::SIGINT,
    }
}

#[cfg(test)]
#[path = "supervise_tests.rs"]
mod tests;
