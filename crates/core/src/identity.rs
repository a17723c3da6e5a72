// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application identity.
//!
//! Two connections presenting the same identity share one application entry
//! in the daemon; the tuple below is the map key.

use serde::{Deserialize, Serialize};

/// Identity of an instrumented application, as presented in its connect frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Ingest license key.
    pub license: String,
    /// Application names, most specific first.
    pub app_names: Vec<String>,
    /// Whether the application runs in high-security mode.
    #[serde(default)]
    pub high_security: bool,
    /// Instrumentation language (e.g. "php").
    pub language: String,
    /// Instrumentation library version.
    pub version: String,
}

/// Expected length of a well-formed license key.
pub const LICENSE_KEY_LEN: usize = 40;

impl AppIdentity {
    /// Primary application name, used in logs.
    pub fn display_name(&self) -> &str {
        self.app_names.first().map(String::as_str).unwrap_or("?")
    }

    /// Shallow validity check on the license key shape.
    ///
    /// The ingest service is the authority on whether a key is live; this
    /// only rejects keys that cannot possibly be valid.
    pub fn license_looks_valid(&self) -> bool {
        self.license.len() == LICENSE_KEY_LEN
            && self.license.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
