// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pidfile::Pidfile;

fn raw_status(raw: i32) -> std::process::ExitStatus {
    std::process::ExitStatus::from_raw(raw)
}

#[yare::parameterized(
    clean_exit   = { 0 << 8, WorkerExit::Graceful(0) },
    config_error = { 1 << 8, WorkerExit::Graceful(1) },
    sigkill      = { 9, WorkerExit::Crashed(Some(9)) },
    sigsegv      = { 11, WorkerExit::Crashed(Some(11)) },
)]
fn worker_exit_classification(raw: i32, expected: WorkerExit) {
    assert_eq!(classify(raw_status(raw)), expected);
}

#[test]
fn daemon_executable_is_absolute() {
    let exe = daemon_executable().unwrap();
    assert!(exe.is_absolute());
}

#[tokio::test]
async fn watcher_yields_to_a_live_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("d.pid");
    let _held = Pidfile::create(&path).unwrap();

    let config = Config {
        pidfile: Some(path),
        ..Config::default()
    };
    let exit = ExitStatus::new();

    // Interlock-benign: another daemon is live, so the watcher exits 0
    // without spawning anything.
    let code = run_watcher(&config, &exit).await.unwrap();
    assert_eq!(code, 0);
    assert_eq!(exit.code(), 0);
}
