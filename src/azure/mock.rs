//! In-memory [`ArmClient`] for tests.
//!
//! Resources are stored by lowercase id. Every call is recorded so tests can
//! assert that check mode or an idempotent run issued no write.

use super::client::ArmClient;
use super::error::{ArmError, ArmResult};
use super::resource_id::ResourceId;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Kind of call made against the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    List,
    Put,
    Delete,
}

impl Operation {
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Put | Self::Delete)
    }
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: Operation,
    pub path: String,
    pub api_version: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    status: u16,
    code: String,
    message: String,
}

#[derive(Default)]
struct MockState {
    resources: BTreeMap<String, Value>,
    calls: Vec<RecordedCall>,
    failures: HashMap<(Operation, String), InjectedFailure>,
}

/// Mock ARM client backed by a map of resources.
#[derive(Clone)]
pub struct MockArmClient {
    subscription_id: String,
    state: Arc<Mutex<MockState>>,
}

fn normalize(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    path.trim_end_matches('/').to_lowercase()
}

impl MockArmClient {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Seed a resource. `id`, `name` and `type` are filled in from `id`.
    pub fn with_resource(self, id: &str, body: Value) -> Self {
        self.insert(id, body);
        self
    }

    pub fn insert(&self, id: &str, body: Value) {
        let stored = Self::complete(id, body);
        self.state.lock().resources.insert(normalize(id), stored);
    }

    /// Current stored body for `id`.
    pub fn resource(&self, id: &str) -> Option<Value> {
        self.state.lock().resources.get(&normalize(id)).cloned()
    }

    pub fn resource_count(&self) -> usize {
        self.state.lock().resources.len()
    }

    /// Make the next and all later `operation` calls on `path` fail.
    pub fn fail_on(&self, operation: Operation, path: &str, status: u16, message: &str) {
        let code = match status {
            404 => "ResourceNotFound",
            403 => "AuthorizationFailed",
            409 => "Conflict",
            _ => "InternalServerError",
        };
        self.state.lock().failures.insert(
            (operation, normalize(path)),
            InjectedFailure {
                status,
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Calls that would have changed something in Azure.
    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation.is_mutating())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn complete(id: &str, body: Value) -> Value {
        let mut body = match body {
            Value::Object(map) => Value::Object(map),
            _ => json!({}),
        };
        if let Ok(parsed) = ResourceId::parse(id) {
            body["id"] = json!(parsed.to_string());
            body["name"] = json!(parsed.name());
            body["type"] = json!(parsed.resource_type());
        } else {
            body["id"] = json!(id);
        }
        body
    }

    fn record(&self, operation: Operation, path: &str, api_version: &str, body: Option<&Value>) -> ArmResult<()> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            operation,
            path: path.to_string(),
            api_version: api_version.to_string(),
            body: body.cloned(),
        });
        match state.failures.get(&(operation, normalize(path))) {
            Some(failure) => Err(ArmError::Api {
                status: failure.status,
                code: failure.code.clone(),
                message: failure.message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn matches_collection(collection: &str, key: &str, body: &Value) -> bool {
        // Direct children: `{collection}/{name}`.
        if let Some((parent, _)) = key.rsplit_once('/') {
            if parent == collection {
                return true;
            }
        }

        let segments: Vec<&str> = collection.trim_start_matches('/').split('/').collect();
        let id = body.get("id").and_then(Value::as_str).unwrap_or(key);
        let Ok(parsed) = ResourceId::parse(id) else {
            return false;
        };

        match segments.as_slice() {
            // Subscription-wide provider listing.
            ["subscriptions", sub, "providers", namespace, kind] => {
                parsed.subscription.eq_ignore_ascii_case(sub)
                    && parsed.resource_group.is_some()
                    && parsed.types.len() == 1
                    && parsed
                        .resource_type()
                        .eq_ignore_ascii_case(&format!("{}/{}", namespace, kind))
            }
            // Everything inside a resource group.
            ["subscriptions", sub, "resourcegroups", rg, "resources"] => {
                parsed.subscription.eq_ignore_ascii_case(sub)
                    && parsed
                        .resource_group
                        .as_deref()
                        .is_some_and(|g| g.eq_ignore_ascii_case(rg))
                    && parsed.namespace.is_some()
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ArmClient for MockArmClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn get(&self, path: &str, api_version: &str) -> ArmResult<Option<Value>> {
        self.record(Operation::Get, path, api_version, None)?;
        Ok(self.state.lock().resources.get(&normalize(path)).cloned())
    }

    async fn list(&self, path: &str, api_version: &str) -> ArmResult<Vec<Value>> {
        self.record(Operation::List, path, api_version, None)?;
        let collection = normalize(path);
        let state = self.state.lock();
        Ok(state
            .resources
            .iter()
            .filter(|(key, body)| Self::matches_collection(&collection, key, body))
            .map(|(_, body)| body.clone())
            .collect())
    }

    async fn put(&self, path: &str, api_version: &str, body: &Value) -> ArmResult<Value> {
        self.record(Operation::Put, path, api_version, Some(body))?;
        let mut stored = Self::complete(path, body.clone());
        if let Some(props) = stored.get_mut("properties").and_then(Value::as_object_mut) {
            props.insert("provisioningState".to_string(), json!("Succeeded"));
        }
        self.state
            .lock()
            .resources
            .insert(normalize(path), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, path: &str, api_version: &str) -> ArmResult<()> {
        self.record(Operation::Delete, path, api_version, None)?;
        let key = normalize(path);
        let mut state = self.state.lock();
        state.resources.remove(&key);
        let prefix = format!("{}/", key);
        state.resources.retain(|k, _| !k.starts_with(&prefix));
        // Deleting a resource group removes everything inside it.
        if let Ok(id) = ResourceId::parse(path) {
            if id.namespace.is_none() {
                if let Some(rg) = id.resource_group {
                    state.resources.retain(|_, body| {
                        body.get("id")
                            .and_then(Value::as_str)
                            .and_then(|i| ResourceId::parse(i).ok())
                            .map_or(true, |r| {
                                !r.resource_group
                                    .as_deref()
                                    .is_some_and(|g| g.eq_ignore_ascii_case(&rg))
                            })
                    });
                }
            }
        }
        Ok(())
    }
}
