// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use beacon_core::{Role, ROLE_ENV_VAR};

/// Role requested through the environment, if any.
pub fn role() -> Option<String> {
    std::env::var(ROLE_ENV_VAR).ok()
}

/// Worker thread count override for the tokio runtime.
pub fn worker_threads() -> Option<usize> {
    std::env::var("BEACOND_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// The environment pair that selects `role` in a respawned process.
pub fn respawn_env(role: Role) -> (&'static str, &'static str) {
    (ROLE_ENV_VAR, role.as_str())
}
