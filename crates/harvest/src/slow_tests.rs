// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn slow(id: u64, max_us: u64) -> SlowSample {
    slow_with_query(id, max_us, "select 1")
}

fn slow_with_query(id: u64, max_us: u64, query: &str) -> SlowSample {
    SlowSample {
        id,
        count: 1,
        total_us: max_us,
        min_us: max_us,
        max_us,
        metric_name: format!("Datastore/statement/{id}"),
        query: query.to_string(),
        txn_name: "WebTransaction/Action/index".to_string(),
        txn_url: "/index".to_string(),
        params: json!({}),
    }
}

fn retained_maxes(r: &SlowReservoir) -> Vec<u64> {
    let mut maxes: Vec<u64> = r.samples().iter().map(|s| s.max_us).collect();
    maxes.sort_unstable();
    maxes
}

#[test]
fn admission_replaces_the_smallest_max() {
    let mut r = SlowReservoir::new(3);
    r.observe(slow(1, 10));
    r.observe(slow(2, 20));
    r.observe(slow(3, 30));

    // Slower than nothing retained: rejected.
    r.observe(slow(4, 5));
    assert_eq!(retained_maxes(&r), vec![10, 20, 30]);

    // Faster than the current minimum max: evicts it.
    r.observe(slow(5, 25));
    assert_eq!(retained_maxes(&r), vec![20, 25, 30]);
}

#[test]
fn duplicate_id_merges_even_at_capacity() {
    let mut r = SlowReservoir::new(1);
    r.observe(slow_with_query(7, 100, "A"));
    r.observe(slow_with_query(7, 150, "B"));

    assert_eq!(r.len(), 1);
    let s = &r.samples()[0];
    assert_eq!(s.count, 2);
    assert_eq!(s.max_us, 150);
    assert_eq!(s.query, "B");
}

#[test]
fn equal_max_does_not_replace() {
    let mut r = SlowReservoir::new(1);
    r.observe(slow(1, 50));
    r.observe(slow(2, 50));

    assert_eq!(r.samples()[0].id, 1);
}

#[test]
fn tie_on_victim_takes_first_in_scan_order() {
    let mut r = SlowReservoir::new(2);
    r.observe(slow(1, 10));
    r.observe(slow(2, 10));
    r.observe(slow(3, 40));

    let ids: Vec<u64> = r.samples().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![3, 2]);
}

/// Every retained record's max is at least the smallest retained max, for
/// any observation sequence.
#[test]
fn retained_min_max_never_exceeds_any_retained_max() {
    let mut r = SlowReservoir::new(4);
    let durations = [13u64, 2, 90, 44, 44, 7, 91, 3, 60, 60, 1, 88];
    for (i, d) in durations.iter().enumerate() {
        r.observe(slow(i as u64, *d));
        assert!(r.len() <= 4);

        let min_max = r.samples().iter().map(|s| s.max_us).min().unwrap();
        for s in r.samples() {
            assert!(s.max_us >= min_max);
        }
    }
}

#[test]
fn swap_returns_contents_and_keeps_capacity() {
    let mut r = SlowReservoir::new(2);
    r.observe(slow(1, 10));
    r.observe(slow(2, 20));

    let retired = r.swap_out();
    assert_eq!(retired.len(), 2);
    assert!(r.is_empty());

    for id in 0..5 {
        r.observe(slow(id, id * 10 + 1));
    }
    assert_eq!(r.len(), 2);
}

#[test]
fn merge_reapplies_admission_policy() {
    let mut a = SlowReservoir::new(2);
    a.observe(slow(1, 10));
    a.observe(slow(2, 20));

    let mut b = SlowReservoir::new(2);
    b.observe(slow(3, 30));
    b.observe(slow(1, 15));

    a.merge(b);
    assert_eq!(a.len(), 2);
    // id=3 (max 30) evicts the weakest record (id=1, max 10); id=1's second
    // occurrence then loses to the new minimum (id=2, max 20).
    let mut ids: Vec<u64> = a.samples().iter().map(|s| s.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![2, 3]);
}
