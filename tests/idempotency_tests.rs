//! Re-running a module with the same arguments must not write anything.

mod common;

use azure_rm::azure::MockArmClient;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

/// Apply `args`, then apply them again and assert the second run is a no-op.
async fn assert_converges(client: &MockArmClient, module: &str, args: Value) {
    let first = run(client, module, args.clone()).await.unwrap();
    assert!(first.changed, "{} did not create: {}", module, first.msg);

    client.clear_calls();
    let second = run(client, module, args).await.unwrap();
    assert!(!second.changed, "{} not idempotent: {:?}", module, second.data.get("compare"));
    assert!(second.msg.ends_with("is up to date"), "{}", second.msg);
    assert!(second.warnings.is_empty(), "{:?}", second.warnings);
    assert!(client.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_resource_group_converges() {
    let client = MockArmClient::new(SUB);
    assert_converges(
        &client,
        "azure_rm_resourcegroup",
        json!({"name": "rg-app", "location": "eastus", "tags": {"env": "prod", "tier": 2}}),
    )
    .await;
}

#[tokio::test]
async fn test_container_registry_converges() {
    let client = seeded_client();
    assert_converges(
        &client,
        "azure_rm_containerregistry",
        json!({"resource_group": "rg1", "name": "acr1", "sku": "Basic", "admin_user_enabled": true}),
    )
    .await;
}

#[tokio::test]
async fn test_virtual_network_converges() {
    let client = seeded_client();
    assert_converges(
        &client,
        "azure_rm_virtualnetwork",
        json!({
            "resource_group": "rg1",
            "name": "vnet1",
            "address_prefixes": ["10.0.0.0/16"],
            "dns_servers": ["10.0.0.4", "10.0.0.5"],
            "subnets": [
                {"name": "default", "address_prefix": "10.0.0.0/24"},
                {"name": "backend", "address_prefix": "10.0.1.0/24"}
            ]
        }),
    )
    .await;
}

#[tokio::test]
async fn test_sql_database_converges() {
    let client = seeded_client();
    assert_converges(
        &client,
        "azure_rm_sqldatabase",
        json!({
            "resource_group": "rg1",
            "server_name": "srv",
            "name": "db1",
            "collation": "SQL_Latin1_General_CP1_CI_AS",
            "max_size_bytes": 1073741824,
            "elastic_pool_name": "pool1",
            "sku": {"name": "S0", "tier": "Standard"}
        }),
    )
    .await;
}

#[tokio::test]
async fn test_private_dns_zone_converges() {
    let client = seeded_client();
    assert_converges(
        &client,
        "azure_rm_privatednszone",
        json!({"resource_group": "rg1", "name": "internal.contoso.com", "tags": {"team": "net"}}),
    )
    .await;
}

#[tokio::test]
async fn test_api_management_converges() {
    let client = seeded_client();
    assert_converges(
        &client,
        "azure_rm_apimanagementservice",
        json!({
            "resource_group": "rg1",
            "name": "apim1",
            "publisher_email": "ops@contoso.com",
            "publisher_name": "Contoso",
            "sku_name": "Developer"
        }),
    )
    .await;
}

// ============================================================================
// Equivalent spellings
// ============================================================================

#[tokio::test]
async fn test_list_order_does_not_matter() {
    let client = seeded_client();
    let subnets = json!([
        {"name": "a", "address_prefix": "10.0.0.0/24"},
        {"name": "b", "address_prefix": "10.0.1.0/24"}
    ]);
    run(
        &client,
        "azure_rm_virtualnetwork",
        json!({"resource_group": "rg1", "name": "vnet1", "address_prefixes": ["10.0.0.0/16", "10.1.0.0/16"], "subnets": subnets}),
    )
    .await
    .unwrap();

    client.clear_calls();
    let output = run(
        &client,
        "azure_rm_virtualnetwork",
        json!({
            "resource_group": "rg1",
            "name": "vnet1",
            "address_prefixes": ["10.1.0.0/16", "10.0.0.0/16"],
            "subnets": [
                {"name": "b", "address_prefix": "10.0.1.0/24"},
                {"name": "a", "address_prefix": "10.0.0.0/24"}
            ]
        }),
    )
    .await
    .unwrap();
    assert!(!output.changed);
    assert!(client.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_location_spelling_does_not_matter() {
    let client = MockArmClient::new(SUB);
    run(&client, "azure_rm_resourcegroup", json!({"name": "rg-app", "location": "westeurope"}))
        .await
        .unwrap();

    client.clear_calls();
    let output = run(&client, "azure_rm_resourcegroup", json!({"name": "rg-app", "location": "West Europe"}))
        .await
        .unwrap();
    assert!(!output.changed);
    assert!(output.warnings.is_empty());
    assert!(client.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_unspecified_options_are_not_compared() {
    let client = seeded_client();
    run(
        &client,
        "azure_rm_virtualnetwork",
        json!({"resource_group": "rg1", "name": "vnet1", "address_prefixes": ["10.0.0.0/16"], "dns_servers": ["10.0.0.4"]}),
    )
    .await
    .unwrap();

    client.clear_calls();
    let output = run(&client, "azure_rm_virtualnetwork", json!({"resource_group": "rg1", "name": "vnet1"}))
        .await
        .unwrap();
    assert!(!output.changed);
    assert!(client.mutating_calls().is_empty());
}

// ============================================================================
// Tags
// ============================================================================

#[tokio::test]
async fn test_appended_tags_converge() {
    let client = MockArmClient::new(SUB);
    let id = rg_id("rg-app");
    run(
        &client,
        "azure_rm_resourcegroup",
        json!({"name": "rg-app", "location": "eastus", "tags": {"env": "prod"}}),
    )
    .await
    .unwrap();

    let added = json!({"name": "rg-app", "tags": {"owner": "ops"}});
    let output = run(&client, "azure_rm_resourcegroup", added.clone()).await.unwrap();
    assert!(output.changed);
    assert_eq!(client.resource(&id).unwrap()["tags"], json!({"env": "prod", "owner": "ops"}));

    client.clear_calls();
    let output = run(&client, "azure_rm_resourcegroup", added).await.unwrap();
    assert!(!output.changed);
    assert!(client.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_replaced_tags_drop_the_rest() {
    let client = MockArmClient::new(SUB);
    let id = rg_id("rg-app");
    run(
        &client,
        "azure_rm_resourcegroup",
        json!({"name": "rg-app", "location": "eastus", "tags": {"env": "prod", "owner": "ops"}}),
    )
    .await
    .unwrap();

    let replace = json!({"name": "rg-app", "tags": {"env": "prod"}, "append_tags": false});
    let output = run(&client, "azure_rm_resourcegroup", replace.clone()).await.unwrap();
    assert!(output.changed);
    assert_eq!(client.resource(&id).unwrap()["tags"], json!({"env": "prod"}));

    client.clear_calls();
    assert!(!run(&client, "azure_rm_resourcegroup", replace).await.unwrap().changed);
    assert!(client.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let client = seeded_client().with_resource(&vnet_id("rg1", "vnet1"), json!({"location": "westeurope"}));
    let args = json!({"resource_group": "rg1", "name": "vnet1", "state": "absent"});

    assert!(run(&client, "azure_rm_virtualnetwork", args.clone()).await.unwrap().changed);
    client.clear_calls();
    assert!(!run(&client, "azure_rm_virtualnetwork", args).await.unwrap().changed);
    assert!(client.mutating_calls().is_empty());
}
