// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process role selection for the daemon spawn chain.
//!
//! A daemon process runs as one of three roles: the progenitor re-executes
//! itself as a session-detached watcher and exits; the watcher supervises a
//! worker and respawns it on crash; the worker does the actual serving.

use serde::{Deserialize, Serialize};

/// Environment variable carrying the role for respawned processes.
pub const ROLE_ENV_VAR: &str = "BEACOND_ROLE";

/// Role of a daemon process in the spawn chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// First process invoked; re-executes itself as a watcher and exits.
    Progenitor,
    /// Session leader; spawns and respawns the worker.
    Watcher,
    /// Serves connections and runs harvests.
    Worker,
}

impl Role {
    /// Parse a role from the environment variable value.
    ///
    /// Only `watcher` and `worker` are valid respawn roles; the progenitor
    /// is never named in the environment.
    pub fn from_env_str(value: &str) -> Option<Role> {
        match value {
            "watcher" => Some(Role::Watcher),
            "worker" => Some(Role::Worker),
            _ => None,
        }
    }

    /// Select the role for this process.
    ///
    /// Precedence: the foreground flag forces `Worker`; otherwise a valid
    /// environment value is used as named; otherwise `Progenitor`.
    pub fn detect(foreground: bool, env_value: Option<&str>) -> Role {
        if foreground {
            return Role::Worker;
        }
        env_value
            .and_then(Role::from_env_str)
            .unwrap_or(Role::Progenitor)
    }

    /// String rendering used for the environment variable and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Progenitor => "progenitor",
            Role::Watcher => "watcher",
            Role::Worker => "worker",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
