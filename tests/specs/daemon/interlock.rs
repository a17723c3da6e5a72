use crate::prelude::*;

#[test]
fn second_daemon_on_the_same_pidfile_exits_zero() {
    let first = ForegroundDaemon::start();

    // Same pidfile, separate socket: the loser must exit 0 without serving.
    let mut second = beacond_cmd()
        .args([
            "-f",
            "--addr",
            first.dir.path().join("other.sock").to_str().unwrap(),
            "--pidfile",
            first.pidfile_path().to_str().unwrap(),
            "--logfile",
            first.dir.path().join("other.log").to_str().unwrap(),
        ])
        .spawn()
        .unwrap();

    let code = wait_for_exit(&mut second);
    assert_eq!(code, Some(0));
    assert!(!first.dir.path().join("other.sock").exists());

    // The winner keeps running and keeps its pid in the file.
    let pid_contents = std::fs::read_to_string(first.pidfile_path()).unwrap();
    assert_eq!(pid_contents.trim(), first.child.id().to_string());
}
