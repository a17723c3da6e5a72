use crate::prelude::*;

#[test]
fn utilization_prints_host_facts_as_json() {
    let output = beacond_cmd().arg("--utilization").output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let facts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(facts.get("pid").is_some());
    assert!(facts.get("logical_processors").is_some());
    assert_eq!(facts["os"], std::env::consts::OS);
}
