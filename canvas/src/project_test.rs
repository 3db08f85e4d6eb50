use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::doc::{Domain, DomainType};

#[test]
fn project_json_has_flat_arrays_and_config() {
    let project = ProjectSnapshot {
        graph: GraphSnapshot { domains: vec![Domain::new("net", DomainType::Networking)], ..Default::default() },
        deployment: DeploymentConfig::default(),
    };
    let value: serde_json::Value = serde_json::from_str(&project.to_json().unwrap()).unwrap();
    assert_eq!(value["domains"].as_array().map(Vec::len), Some(1));
    assert!(value["resources"].as_array().is_some_and(Vec::is_empty));
    assert_eq!(value["deployment_config"]["primary_region"], json!("us-east-1"));
}

#[test]
fn project_round_trips() {
    let project = ProjectSnapshot {
        graph: GraphSnapshot { domains: vec![Domain::new("data", DomainType::Data)], ..Default::default() },
        deployment: DeploymentConfig {
            primary_region: "eu-west-1".into(),
            availability_zones: vec!["eu-west-1a".into()],
            replica_regions: Vec::new(),
        },
    };
    let back = ProjectSnapshot::from_json(&project.to_json().unwrap()).unwrap();
    assert_eq!(back, project);
}

#[test]
fn missing_config_uses_default() {
    let raw = json!({ "domains": [], "resources": [], "connections": [] }).to_string();
    let project = ProjectSnapshot::from_json(&raw).unwrap();
    assert_eq!(project.deployment, DeploymentConfig::default());
    assert!(project.graph.is_empty());
}

#[test]
fn malformed_input_is_a_decode_error() {
    assert!(matches!(ProjectSnapshot::from_json("{ not json"), Err(SnapshotError::Decode(_))));
    let raw = json!({ "domains": [{ "id": Uuid::nil(), "name": "x", "type": "nope" }] }).to_string();
    assert!(matches!(ProjectSnapshot::from_json(&raw), Err(SnapshotError::Decode(_))));
}

#[test]
fn non_uuid_entity_id_rejects_the_snapshot() {
    let raw = json!({ "domains": [{ "id": "web-tier", "name": "x", "type": "compute" }] }).to_string();
    assert!(matches!(ProjectSnapshot::from_json(&raw), Err(SnapshotError::Decode(_))));
}
