// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reduction of retired reservoirs into ingest payload bytes.
//!
//! Payloads carry no application-run identity; the run token travels in the
//! upload URL. Empty reservoirs reduce to `None` so that nothing is sent
//! for them.

use serde_json::json;
use thiserror::Error;

use crate::errors::ErrorReservoir;
use crate::events::EventReservoir;
use crate::metrics::MetricTable;
use crate::reservoir::Reservoir;
use crate::slow::SlowReservoir;

/// Payload construction errors.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("params compression failed: {0}")]
    Compress(#[from] std::io::Error),
}

/// Name of the supportability metric reporting over-cap metric drops.
pub const METRICS_DROPPED: &str = "Supportability/MetricsDropped";

/// Compression level for slow-sample params blobs.
const PARAMS_ZSTD_LEVEL: i32 = 3;

/// Reduce an event reservoir: a sampling header followed by the raw event
/// blobs.
pub fn events(reservoir: &EventReservoir) -> Result<Option<Vec<u8>>, PayloadError> {
    if reservoir.is_empty() {
        return Ok(None);
    }
    let body = json!([
        {
            "reservoir_size": reservoir.len(),
            "events_seen": reservoir.seen(),
        },
        reservoir.samples(),
    ]);
    Ok(Some(serde_json::to_vec(&body)?))
}

/// Reduce a metric table: `[[{"name": n}, [count, total, exclusive, min,
/// max, sum_of_squares]], ...]`, with a trailing supportability entry when
/// samples were dropped over the name cap.
pub fn metrics(table: &MetricTable) -> Result<Option<Vec<u8>>, PayloadError> {
    if table.is_empty() && table.dropped() == 0 {
        return Ok(None);
    }

    let mut rows: Vec<serde_json::Value> = table
        .iter()
        .map(|(name, data)| {
            json!([
                { "name": name },
                [
                    data.count,
                    data.total,
                    data.exclusive,
                    data.min,
                    data.max,
                    data.sum_of_squares,
                ],
            ])
        })
        .collect();

    if table.dropped() > 0 {
        rows.push(json!([
            { "name": METRICS_DROPPED },
            [table.dropped(), 0.0, 0.0, 0.0, 0.0, 0.0],
        ]));
    }

    Ok(Some(serde_json::to_vec(&rows)?))
}

/// Reduce an error reservoir: `[[when_ms, txn, message, class, attrs], ...]`,
/// oldest first.
pub fn errors(reservoir: &ErrorReservoir) -> Result<Option<Vec<u8>>, PayloadError> {
    if reservoir.is_empty() {
        return Ok(None);
    }
    let rows: Vec<serde_json::Value> = reservoir
        .errors()
        .iter()
        .map(|e| json!([e.when_ms, e.txn_name, e.message, e.class, e.attributes]))
        .collect();
    Ok(Some(serde_json::to_vec(&rows)?))
}

/// Reduce a slow-sample reservoir.
///
/// Each record is a fixed-order tuple of the descriptive fields followed by
/// count, total, min and max converted to milliseconds, then the encoded
/// params blob. The outer wrapper is a single-element array containing the
/// record array. `compress` is disabled for the audit variant.
pub fn slow_samples(
    reservoir: &SlowReservoir,
    compress: bool,
) -> Result<Option<Vec<u8>>, PayloadError> {
    if reservoir.is_empty() {
        return Ok(None);
    }

    let mut rows = Vec::with_capacity(reservoir.len());
    for s in reservoir.samples() {
        let params = encode_params(&s.params, compress)?;
        rows.push(json!([
            s.txn_name,
            s.txn_url,
            s.id,
            s.query,
            s.metric_name,
            s.count,
            s.total_us as f64 / 1000.0,
            s.min_us as f64 / 1000.0,
            s.max_us as f64 / 1000.0,
            params,
        ]));
    }

    let body = json!([rows]);
    Ok(Some(serde_json::to_vec(&body)?))
}

/// Base64 of the params JSON, optionally zstd-compressed first.
fn encode_params(params: &serde_json::Value, compress: bool) -> Result<String, PayloadError> {
    use base64::Engine as _;

    let raw = serde_json::to_vec(params)?;
    let bytes = if compress {
        zstd::encode_all(raw.as_slice(), PARAMS_ZSTD_LEVEL)?
    } else {
        raw
    };
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
