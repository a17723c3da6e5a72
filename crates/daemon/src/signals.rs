// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal dispatcher for the worker.
//!
//! OS signals are translated into channel messages consumed by the serve
//! loop; reservoir code is never called from signal context.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// Message derived from an OS signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMsg {
    /// SIGTERM or SIGINT: orderly drain and exit.
    Shutdown,
    /// SIGHUP: reopen the log file.
    ReopenLog,
}

/// Install handlers and spawn the dispatcher task.
pub fn spawn_dispatcher() -> std::io::Result<mpsc::Receiver<SignalMsg>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                _ = sigterm.recv() => SignalMsg::Shutdown,
                _ = sigint.recv() => SignalMsg::Shutdown,
                _ = sighup.recv() => SignalMsg::ReopenLog,
            };
            if tx.send(msg).await.is_err() {
                return;
            }
        }
    });

    Ok(rx)
}
