//! Tests for the `_info` read dispatcher.
//!
//! These tests verify that:
//! - exactly one read route fires per call, most specific first
//! - single objects are wrapped in a one-element list
//! - list results keep service order and count
//! - a missing resource yields an empty list while other errors fail

mod common;

use azure_rm::azure::mock::Operation;
use azure_rm::azure::MockArmClient;
use azure_rm::modules::info::select_route;
use azure_rm::modules::{Module, ModuleError};
use azure_rm::resources::virtual_network::VIRTUAL_NETWORK;
use common::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

fn client_with_vnets() -> MockArmClient {
    seeded_client()
        .with_resource(
            &vnet_id("rg1", "alpha"),
            json!({"location": "westeurope", "tags": {"env": "prod"}, "properties": {"addressSpace": {"addressPrefixes": ["10.0.0.0/16"]}}}),
        )
        .with_resource(
            &vnet_id("rg1", "beta"),
            json!({"location": "westeurope", "tags": {"env": "dev"}, "properties": {}}),
        )
        .with_resource(&vnet_id("rg2", "gamma"), json!({"location": "eastus", "properties": {}}))
}

fn names(output: &Value) -> Vec<String> {
    output["virtualnetworks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Route selection
// ============================================================================

#[tokio::test]
async fn test_get_wraps_single_object() {
    let client = client_with_vnets();
    let output = run(
        &client,
        "azure_rm_virtualnetwork_info",
        json!({"resource_group": "rg1", "name": "alpha"}),
    )
    .await
    .unwrap();

    assert!(!output.changed);
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(names(&value), vec!["alpha"]);
    assert_eq!(
        value["virtualnetworks"][0]["properties"]["address_space"]["address_prefixes"],
        json!(["10.0.0.0/16"])
    );
    assert_eq!(client.calls().len(), 1);
    assert_eq!(client.calls()[0].operation, Operation::Get);
}

#[tokio::test]
async fn test_list_by_resource_group_keeps_order_and_count() {
    let client = client_with_vnets();
    let output = run(&client, "azure_rm_virtualnetwork_info", json!({"resource_group": "rg1"}))
        .await
        .unwrap();

    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(names(&value), vec!["alpha", "beta"]);
    assert_eq!(client.calls().len(), 1);
    assert_eq!(client.calls()[0].operation, Operation::List);
}

#[tokio::test]
async fn test_list_all_without_identity() {
    let client = client_with_vnets();
    let output = run(&client, "azure_rm_virtualnetwork_info", json!({})).await.unwrap();
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(names(&value).len(), 3);
    assert!(client.calls()[0].path.ends_with("/providers/Microsoft.Network/virtualNetworks"));
}

#[tokio::test]
async fn test_name_without_group_lists_everything() {
    let client = client_with_vnets();
    let output = run(&client, "azure_rm_virtualnetwork_info", json!({"name": "alpha"}))
        .await
        .unwrap();
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(names(&value).len(), 3);
}

#[tokio::test]
async fn test_sql_database_routes_need_server() {
    let client = seeded_client()
        .with_resource(&sql_db_id("rg1", "srv", "db1"), json!({"location": "westeurope"}))
        .with_resource(&sql_db_id("rg1", "srv", "db2"), json!({"location": "westeurope"}));

    let output = run(
        &client,
        "azure_rm_sqldatabase_info",
        json!({"resource_group": "rg1", "server_name": "srv"}),
    )
    .await
    .unwrap();
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(value["databases"].as_array().unwrap().len(), 2);

    let err = run(&client, "azure_rm_sqldatabase_info", json!({"resource_group": "rg1"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ModuleError::MissingParameter(_)));
    assert_eq!(client.calls().len(), 1);
}

// ============================================================================
// Outcomes
// ============================================================================

#[tokio::test]
async fn test_missing_resource_is_empty_list() {
    let client = client_with_vnets();
    let output = run(
        &client,
        "azure_rm_virtualnetwork_info",
        json!({"resource_group": "rg1", "name": "nope"}),
    )
    .await
    .unwrap();
    assert!(!output.failed);
    assert_eq!(output.data["virtualnetworks"], json!([]));
}

#[tokio::test]
async fn test_other_errors_are_not_swallowed() {
    let client = client_with_vnets();
    client.fail_on(Operation::Get, &vnet_id("rg1", "alpha"), 500, "InternalServerError");

    let err = run(
        &client,
        "azure_rm_virtualnetwork_info",
        json!({"resource_group": "rg1", "name": "alpha"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ModuleError::ExecutionFailed(_)));
    assert!(err.to_string().contains("Failed to get virtual network"));
}

#[tokio::test]
async fn test_tag_filter() {
    let client = client_with_vnets();
    let output = run(
        &client,
        "azure_rm_virtualnetwork_info",
        json!({"resource_group": "rg1", "tags": ["env:prod"]}),
    )
    .await
    .unwrap();
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(names(&value), vec!["alpha"]);
}

#[tokio::test]
async fn test_resource_group_info_by_name() {
    let client = seeded_client();
    let output = run(&client, "azure_rm_resourcegroup_info", json!({"name": "rg1"}))
        .await
        .unwrap();
    assert_eq!(output.data["resourcegroups"][0]["location"], "westeurope");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_most_specific_route_fires(has_group in any::<bool>(), has_name in any::<bool>()) {
        let module = azure_rm::modules::info::InfoModule::new(&VIRTUAL_NETWORK);
        let mut raw = serde_json::Map::new();
        if has_group {
            raw.insert("resource_group".to_string(), json!("rg1"));
        }
        if has_name {
            raw.insert("name".to_string(), json!("vnet"));
        }
        let args = module.validate_params(&params(Value::Object(raw))).unwrap();
        let route = select_route(VIRTUAL_NETWORK.routes, &args).unwrap();

        let expected = match (has_group, has_name) {
            (true, true) => "get",
            (true, false) => "list",
            (false, _) => "list_all",
        };
        prop_assert_eq!(route.operation, expected);
    }
}
