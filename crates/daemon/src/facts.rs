// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host facts for `--utilization`.

use serde_json::json;

/// Gather static host facts as JSON.
pub fn gather() -> serde_json::Value {
    json!({
        "hostname": hostname(),
        "logical_processors": logical_processors(),
        "total_ram_mib": total_ram_mib(),
        "pid": std::process::id(),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "version": env!("CARGO_PKG_VERSION"),
    })
}

fn hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
}

fn logical_processors() -> Option<usize> {
    std::thread::available_parallelism().ok().map(|n| n.get())
}

fn total_ram_mib() -> Option<u64> {
    let contents = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_total_mib(&contents)
}

/// Parse the `MemTotal:` line of /proc/meminfo (value in kB).
fn parse_meminfo_total_mib(contents: &str) -> Option<u64> {
    let line = contents.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024)
}

#[cfg(test)]
#[path = "facts_tests.rs"]
mod tests;
