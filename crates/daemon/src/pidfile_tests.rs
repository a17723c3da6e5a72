// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn second_create_on_same_path_is_already_locked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("d.pid");

    let first = Pidfile::create(&path).unwrap();
    assert!(matches!(
        Pidfile::create(&path),
        Err(PidfileError::AlreadyLocked(_))
    ));

    // After the winner removes the file, a third create succeeds.
    first.remove();
    assert!(Pidfile::create(&path).is_ok());
}

#[test]
fn concurrent_creates_admit_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("d.pid");

    // Every contender holds its outcome until all attempts are done, so a
    // winner's release cannot hand the lock to a later attempt.
    let barrier = std::sync::Arc::new(std::sync::Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            let barrier = std::sync::Arc::clone(&barrier);
            std::thread::spawn(move || {
                let outcome = Pidfile::create(&path);
                barrier.wait();
                outcome.is_ok()
            })
        })
        .collect();
    let wins: usize = handles
        .into_iter()
        .map(|h| usize::from(h.join().unwrap()))
        .sum();

    assert_eq!(wins, 1);
}

#[test]
fn write_stores_pid_as_decimal_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("d.pid");

    let mut pidfile = Pidfile::create(&path).unwrap();
    pidfile.write().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim(), std::process::id().to_string());
}

#[test]
fn write_truncates_prior_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("d.pid");
    std::fs::write(&path, "99999999 stale junk\n").unwrap();

    let mut pidfile = Pidfile::create(&path).unwrap();
    pidfile.write().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim(), std::process::id().to_string());
}

#[test]
fn remove_unlinks_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("d.pid");

    let pidfile = Pidfile::create(&path).unwrap();
    pidfile.remove();
    assert!(!path.exists());
}
