use crate::prelude::*;

#[test]
fn help_prints_usage_and_exits_cleanly() {
    let output = beacond_cmd().arg("--help").output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--addr"));
    assert!(stdout.contains("--foreground"));
}

#[test]
fn version_flag_prints_version() {
    let output = beacond_cmd().arg("-v").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("beacond"));
}

#[test]
fn unknown_flag_exits_two() {
    let output = beacond_cmd().arg("--definitely-not-a-flag").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn flag_missing_its_value_exits_two() {
    let output = beacond_cmd().arg("--loglevel").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unreadable_config_file_exits_one() {
    let output = beacond_cmd()
        .args(["-c", "/nonexistent/beacond.cfg", "-f"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read config file"));
}
