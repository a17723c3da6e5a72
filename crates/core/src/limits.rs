// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-reservoir capacity limits.

use serde::{Deserialize, Serialize};

/// Capacities applied to each application entry's reservoirs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Analytics event reservoir capacity.
    pub events: usize,
    /// Custom event reservoir capacity.
    pub custom_events: usize,
    /// Error reservoir capacity.
    pub errors: usize,
    /// Slow-sample reservoir capacity.
    pub slow_samples: usize,
    /// Distinct metric names admitted per harvest cycle.
    pub metric_names: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            events: 10_000,
            custom_events: 10_000,
            errors: 20,
            slow_samples: 10,
            metric_names: 2_000,
        }
    }
}
