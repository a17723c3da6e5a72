//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

/// How long specs wait for daemon-side effects (socket/pidfile creation,
/// process exit) before failing.
pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(5);
pub const SPEC_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Returns the path to a binary built by this workspace.
///
/// Resolves relative to the test binary itself (target/debug/deps/..), so
/// it works regardless of the invocation directory.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where beacond is built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// A Command for the beacond binary.
pub fn beacond_cmd() -> Command {
    Command::new(binary_path("beacond"))
}

/// Poll until `pred` holds or the spec timeout elapses.
pub fn wait_until(mut pred: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < SPEC_WAIT_MAX {
        if pred() {
            return true;
        }
        std::thread::sleep(SPEC_POLL_INTERVAL);
    }
    false
}

/// Wait for a child to exit, returning its code; kills it on timeout.
pub fn wait_for_exit(child: &mut Child) -> Option<i32> {
    let start = Instant::now();
    while start.elapsed() < SPEC_WAIT_MAX {
        if let Ok(Some(status)) = child.try_wait() {
            return status.code();
        }
        std::thread::sleep(SPEC_POLL_INTERVAL);
    }
    let _ = child.kill();
    let _ = child.wait();
    panic!("child did not exit within {SPEC_WAIT_MAX:?}");
}

/// Send SIGTERM to a process.
pub fn terminate(pid: u32) {
    let _ = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status();
}

/// A foreground daemon with its scratch directory; killed on drop.
pub struct ForegroundDaemon {
    pub child: Child,
    pub dir: tempfile::TempDir,
}

impl ForegroundDaemon {
    /// Start `beacond -f` with socket, pidfile and logfile in a tempdir.
    pub fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let child = beacond_cmd()
            .args([
                "-f",
                "--addr",
                dir.path().join("d.sock").to_str().unwrap(),
                "--pidfile",
                dir.path().join("d.pid").to_str().unwrap(),
                "--logfile",
                dir.path().join("d.log").to_str().unwrap(),
            ])
            .spawn()
            .unwrap();

        let daemon = Self { child, dir };
        assert!(
            wait_until(|| daemon.socket_path().exists()),
            "daemon did not open its socket; log:\n{}",
            daemon.log_contents()
        );
        daemon
    }

    pub fn socket_path(&self) -> PathBuf {
        self.dir.path().join("d.sock")
    }

    pub fn pidfile_path(&self) -> PathBuf {
        self.dir.path().join("d.pid")
    }

    pub fn log_contents(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("d.log")).unwrap_or_default()
    }
}

impl Drop for ForegroundDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
