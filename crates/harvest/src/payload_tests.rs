// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::reservoir::Reservoir;
use base64::Engine as _;
use beacon_core::{AnalyticsEvent, ErrorEvent, MetricSample, SlowSample};
use serde_json::{json, Value};

fn parse(bytes: Vec<u8>) -> Value {
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn empty_reservoirs_reduce_to_none() {
    assert!(events(&EventReservoir::new(4)).unwrap().is_none());
    assert!(metrics(&MetricTable::new(4)).unwrap().is_none());
    assert!(errors(&ErrorReservoir::new(4)).unwrap().is_none());
    assert!(slow_samples(&SlowReservoir::new(4), true).unwrap().is_none());
}

#[test]
fn event_payload_carries_sampling_header() {
    let mut r = EventReservoir::with_seed(2, 1);
    for i in 0..5 {
        r.observe(AnalyticsEvent(json!({"id": i})));
    }

    let body = parse(events(&r).unwrap().unwrap());
    assert_eq!(body[0]["reservoir_size"], 2);
    assert_eq!(body[0]["events_seen"], 5);
    assert_eq!(body[1].as_array().unwrap().len(), 2);
}

#[test]
fn metric_payload_appends_supportability_row_for_drops() {
    let mut t = MetricTable::new(1);
    t.observe(MetricSample {
        name: "a".to_string(),
        duration_us: 2_000_000,
        exclusive_us: 1_000_000,
    });
    t.observe(MetricSample {
        name: "b".to_string(),
        duration_us: 1,
        exclusive_us: 0,
    });

    let rows = parse(metrics(&t).unwrap().unwrap());
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    let dropped = rows
        .iter()
        .find(|row| row[0]["name"] == METRICS_DROPPED)
        .unwrap();
    assert_eq!(dropped[1][0], 1);

    let a = rows.iter().find(|row| row[0]["name"] == "a").unwrap();
    assert_eq!(a[1][0], 1);
    assert!((a[1][1].as_f64().unwrap() - 2.0).abs() < 1e-9);
    assert!((a[1][2].as_f64().unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn error_payload_is_oldest_first_tuples() {
    let mut r = ErrorReservoir::new(4);
    for when in [5u64, 9] {
        r.observe(ErrorEvent {
            when_ms: when,
            txn_name: "txn".to_string(),
            message: "m".to_string(),
            class: "E".to_string(),
            attributes: json!({"k": "v"}),
        });
    }

    let rows = parse(errors(&r).unwrap().unwrap());
    assert_eq!(rows[0][0], 5);
    assert_eq!(rows[1][0], 9);
    assert_eq!(rows[0][4]["k"], "v");
}

fn one_slow_sample() -> SlowReservoir {
    let mut r = SlowReservoir::new(2);
    r.observe(SlowSample {
        id: 42,
        count: 3,
        total_us: 6000,
        min_us: 1000,
        max_us: 3000,
        metric_name: "Datastore/statement/users".to_string(),
        query: "select * from users".to_string(),
        txn_name: "WebTransaction/Action/index".to_string(),
        txn_url: "/index".to_string(),
        params: json!({"plan": "seq scan"}),
    });
    r
}

#[test]
fn slow_payload_shape_and_unit_conversion() {
    let body = parse(slow_samples(&one_slow_sample(), true).unwrap().unwrap());

    // Single-element outer wrapper around the record array.
    assert_eq!(body.as_array().unwrap().len(), 1);
    let row = &body[0][0];

    assert_eq!(row[0], "WebTransaction/Action/index");
    assert_eq!(row[1], "/index");
    assert_eq!(row[2], 42);
    assert_eq!(row[3], "select * from users");
    assert_eq!(row[4], "Datastore/statement/users");
    assert_eq!(row[5], 3);
    assert!((row[6].as_f64().unwrap() - 6.0).abs() < 1e-9);
    assert!((row[7].as_f64().unwrap() - 1.0).abs() < 1e-9);
    assert!((row[8].as_f64().unwrap() - 3.0).abs() < 1e-9);
}

#[test]
fn slow_params_round_trip_through_zstd_and_base64() {
    let body = parse(slow_samples(&one_slow_sample(), true).unwrap().unwrap());
    let encoded = body[0][0][9].as_str().unwrap();

    let compressed = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    let raw = zstd::decode_all(compressed.as_slice()).unwrap();
    let params: Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(params["plan"], "seq scan");
}

#[test]
fn audit_variant_skips_compression() {
    let body = parse(slow_samples(&one_slow_sample(), false).unwrap().unwrap());
    let encoded = body[0][0][9].as_str().unwrap();

    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    let params: Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(params["plan"], "seq scan");
}
