use crate::prelude::*;
use std::io::{Read, Write};

#[test]
fn foreground_worker_writes_pid_and_drains_on_sigterm() {
    let mut daemon = ForegroundDaemon::start();

    let pid_contents = std::fs::read_to_string(daemon.pidfile_path()).unwrap();
    assert_eq!(pid_contents.trim(), daemon.child.id().to_string());

    terminate(daemon.child.id());
    let code = wait_for_exit(&mut daemon.child);
    assert_eq!(code, Some(0));

    // Orderly drain removes the socket and pid files.
    assert!(!daemon.socket_path().exists());
    assert!(!daemon.pidfile_path().exists());
}

/// Write one length-prefixed JSON frame.
fn write_frame(stream: &mut std::os::unix::net::UnixStream, frame: &serde_json::Value) {
    let body = serde_json::to_vec(frame).unwrap();
    stream
        .write_all(&(body.len() as u32).to_be_bytes())
        .unwrap();
    stream.write_all(&body).unwrap();
}

/// Read one length-prefixed JSON frame.
fn read_frame(stream: &mut std::os::unix::net::UnixStream) -> serde_json::Value {
    let mut len = [0u8; 4];
    stream.read_exact(&mut len).unwrap();
    let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
    stream.read_exact(&mut body).unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[test]
fn malformed_license_is_rejected_over_the_socket() {
    let daemon = ForegroundDaemon::start();

    let mut stream =
        std::os::unix::net::UnixStream::connect(daemon.socket_path()).unwrap();
    write_frame(
        &mut stream,
        &serde_json::json!({
            "type": "Connect",
            "identity": {
                "license": "too-short",
                "app_names": ["Shop"],
                "high_security": false,
                "language": "php",
                "version": "11.0.0",
            },
        }),
    );

    let reply = read_frame(&mut stream);
    assert_eq!(reply["type"], "Rejected");
    assert_eq!(reply["reason"]["kind"], "InvalidLicense");
}

#[test]
fn garbage_frame_closes_the_connection_but_not_the_daemon() {
    let daemon = ForegroundDaemon::start();

    let mut stream =
        std::os::unix::net::UnixStream::connect(daemon.socket_path()).unwrap();
    stream.write_all(&8u32.to_be_bytes()).unwrap();
    stream.write_all(b"not json").unwrap();

    // The daemon closes this connection...
    let mut buf = [0u8; 1];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);

    // ...and keeps serving new ones.
    assert!(std::os::unix::net::UnixStream::connect(daemon.socket_path()).is_ok());
}
