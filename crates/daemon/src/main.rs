// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! beacond: telemetry relay daemon.
//!
//! Role dispatch happens here: the progenitor re-executes itself as a
//! watcher and exits; watcher and worker set up logging and a tokio
//! runtime, then run their role. The process-wide exit status is read
//! exactly once, at the bottom of `run`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use beacon_core::{ExitStatus, Role};
use beacon_daemon::config::{self, Config};
use beacon_daemon::logging::LogHandle;
use beacon_daemon::{env, facts, lifecycle, logging, supervise};
use tracing::error;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    let opts = match config::parse_args(&args) {
        Ok(opts) => opts,
        Err(e) => return parse_error_code(e),
    };

    if opts.utilization {
        return print_utilization();
    }

    let config = match Config::load(&opts) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("beacond: {e}");
            return 1;
        }
    };

    let role = Role::detect(config.foreground, env::role().as_deref());
    let exit = ExitStatus::new();

    match role {
        Role::Progenitor => match supervise::spawn_watcher() {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("beacond: {e}");
                1
            }
        },
        Role::Watcher => {
            // Detach from the progenitor's session.
            let _ = nix::unistd::setsid();
            run_watcher_process(&config, &exit)
        }
        Role::Worker => run_worker_process(config, &exit),
    }
}

/// Exit code for a failed argument parse: help and version print and exit
/// cleanly; anything else is usage shown as an error.
fn parse_error_code(e: clap::Error) -> i32 {
    use clap::error::ErrorKind;

    let kind = e.kind();
    let _ = e.print();
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 2,
    }
}

fn print_utilization() -> i32 {
    match serde_json::to_string_pretty(&facts::gather()) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("beacond: {e}");
            1
        }
    }
}

/// Logging and runtime setup shared by watcher and worker.
fn setup(config: &Config) -> Result<(tokio::runtime::Runtime, LogHandle), String> {
    let path = logging::resolve_path(config).map_err(|e| e.to_string())?;
    let log = logging::init(&path, config.loglevel).map_err(|e| e.to_string())?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(threads) = env::worker_threads() {
        builder.worker_threads(threads);
    }
    let runtime = builder.build().map_err(|e| e.to_string())?;

    Ok((runtime, log))
}

fn run_watcher_process(config: &Config, exit: &ExitStatus) -> i32 {
    let (runtime, _log) = match setup(config) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("beacond: {e}");
            return 1;
        }
    };

    if let Err(e) = runtime.block_on(supervise::run_watcher(config, exit)) {
        error!("watcher failed: {e}");
        eprintln!("beacond: {e}");
        exit.raise(1);
    }
    exit.code()
}

fn run_worker_process(config: Config, exit: &ExitStatus) -> i32 {
    let (runtime, log) = match setup(&config) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("beacond: {e}");
            return 1;
        }
    };

    // In the supervised chain the watcher holds the PID file; a foreground
    // worker owns it itself.
    let own_pidfile = config.foreground;
    match runtime.block_on(lifecycle::serve(config, Some(log), own_pidfile)) {
        Ok(()) => {}
        // Another daemon is live: exit 0 silently.
        Err(lifecycle::LifecycleError::AlreadyRunning) => {}
        Err(e) => {
            error!("daemon failed: {e}");
            eprintln!("beacond: {e}");
            exit.raise(1);
        }
    }
    exit.code()
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
