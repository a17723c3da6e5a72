// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-application reservoir bundle.

use beacon_core::Limits;

use crate::errors::ErrorReservoir;
use crate::events::EventReservoir;
use crate::metrics::MetricTable;
use crate::payload::{self, PayloadError};
use crate::reservoir::Reservoir;
use crate::slow::SlowReservoir;

/// Kind tag for a reduced payload; decides the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Metrics,
    Errors,
    Events,
    CustomEvents,
    SlowSamples,
}

impl PayloadKind {
    /// Ingest endpoint path segment.
    pub fn endpoint(&self) -> &'static str {
        match self {
            PayloadKind::Metrics => "metric_data",
            PayloadKind::Errors => "error_data",
            PayloadKind::Events => "analytic_event_data",
            PayloadKind::CustomEvents => "custom_event_data",
            PayloadKind::SlowSamples => "sql_trace_data",
        }
    }
}

/// One reduced payload ready for upload.
#[derive(Debug, Clone)]
pub struct Payload {
    pub kind: PayloadKind,
    pub body: Vec<u8>,
}

/// The reservoirs of one application entry.
#[derive(Debug)]
pub struct Harvest {
    pub events: EventReservoir,
    pub custom_events: EventReservoir,
    pub metrics: MetricTable,
    pub errors: ErrorReservoir,
    pub slow_samples: SlowReservoir,
}

impl Harvest {
    /// Fresh bundle with the configured capacities.
    pub fn new(limits: &Limits) -> Self {
        Self {
            events: EventReservoir::new(limits.events),
            custom_events: EventReservoir::new(limits.custom_events),
            metrics: MetricTable::new(limits.metric_names),
            errors: ErrorReservoir::new(limits.errors),
            slow_samples: SlowReservoir::new(limits.slow_samples),
        }
    }

    /// Take the current contents of every reservoir, leaving empty ones of
    /// the same capacities in place.
    ///
    /// The caller holds the entry lock, so the swap is one observable
    /// event: every observation lands either in the retired bundle or the
    /// next one, never split.
    pub fn swap_out(&mut self) -> Harvest {
        Harvest {
            events: self.events.swap_out(),
            custom_events: self.custom_events.swap_out(),
            metrics: self.metrics.swap_out(),
            errors: self.errors.swap_out(),
            slow_samples: self.slow_samples.swap_out(),
        }
    }

    /// True when every reservoir is empty and nothing was dropped.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
            && self.custom_events.is_empty()
            && self.metrics.is_empty()
            && self.metrics.dropped() == 0
            && self.errors.is_empty()
            && self.slow_samples.is_empty()
    }

    /// Reduce every reservoir to its payload, in the fixed upload order:
    /// metrics, errors, analytics events, custom events, slow samples.
    ///
    /// Later upload failures never retroactively invalidate earlier
    /// successes, so the order is part of the contract. Empty reservoirs
    /// contribute nothing.
    pub fn reduce(&self, audit: bool) -> Result<Vec<Payload>, PayloadError> {
        let mut payloads = Vec::new();

        let ordered: [(PayloadKind, Option<Vec<u8>>); 5] = [
            (PayloadKind::Metrics, payload::metrics(&self.metrics)?),
            (PayloadKind::Errors, payload::errors(&self.errors)?),
            (PayloadKind::Events, payload::events(&self.events)?),
            (
                PayloadKind::CustomEvents,
                payload::events(&self.custom_events)?,
            ),
            (
                PayloadKind::SlowSamples,
                payload::slow_samples(&self.slow_samples, !audit)?,
            ),
        ];

        for (kind, body) in ordered {
            if let Some(body) = body {
                payloads.push(Payload { kind, body });
            }
        }
        Ok(payloads)
    }
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
