//! Shared helpers for the integration suites.

#![allow(dead_code)]

use azure_rm::azure::MockArmClient;
use azure_rm::modules::{ModuleContext, ModuleOutput, ModuleParams, ModuleRegistry, ModuleResult};
use serde_json::{json, Value};
use std::sync::Arc;

pub const SUB: &str = "00000000-0000-0000-0000-000000000000";

pub fn rg_id(rg: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", SUB, rg)
}

pub fn provider_id(rg: &str, resource: &str) -> String {
    format!("{}/providers/{}", rg_id(rg), resource)
}

pub fn vnet_id(rg: &str, name: &str) -> String {
    provider_id(rg, &format!("Microsoft.Network/virtualNetworks/{}", name))
}

pub fn sql_db_id(rg: &str, server: &str, name: &str) -> String {
    provider_id(rg, &format!("Microsoft.Sql/servers/{}/databases/{}", server, name))
}

/// Build module parameters from a JSON object.
pub fn params(value: Value) -> ModuleParams {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => ModuleParams::new(),
    }
}

/// Mock holding resource group `rg1` in West Europe.
pub fn seeded_client() -> MockArmClient {
    MockArmClient::new(SUB).with_resource(&rg_id("rg1"), json!({"location": "westeurope"}))
}

pub fn context(client: &MockArmClient) -> ModuleContext {
    ModuleContext::new().with_client(Arc::new(client.clone()))
}

pub async fn run(client: &MockArmClient, module: &str, args: Value) -> ModuleResult<ModuleOutput> {
    ModuleRegistry::with_builtins()
        .execute(module, &params(args), &context(client))
        .await
}

pub async fn run_check(client: &MockArmClient, module: &str, args: Value) -> ModuleResult<ModuleOutput> {
    let context = context(client).with_check_mode(true).with_diff_mode(true);
    ModuleRegistry::with_builtins()
        .execute(module, &params(args), &context)
        .await
}
