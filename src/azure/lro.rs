//! Long-running operation (LRO) tracking.
//!
//! ARM signals asynchronous work in three ways:
//!
//! - an `Azure-AsyncOperation` header pointing at a status resource whose
//!   `status` eventually becomes `Succeeded`, `Failed` or `Canceled`
//! - a `Location` header that answers `202` until the operation is done
//! - a `properties.provisioningState` on the resource itself
//!
//! This module holds the protocol-level pieces; the polling loop lives on the
//! HTTP client.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Polling settings for long-running operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Delay between polls when the service gives no `Retry-After`.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Upper bound for one operation.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(1800),
        }
    }
}

/// Status of an operation as reported by ARM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    /// Interpret a `status` / `provisioningState` string.
    ///
    /// Anything that is not a known terminal state counts as in progress,
    /// which covers resource-specific states like `Creating` or `Updating`.
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Polling hints carried by a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LroHeaders {
    pub azure_async_operation: Option<String>,
    pub location: Option<String>,
    pub retry_after: Option<Duration>,
}

impl LroHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            azure_async_operation: get("azure-asyncoperation"),
            location: get("location"),
            retry_after: get("retry-after")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }

    /// Whether the response points at something to poll.
    pub fn is_async(&self) -> bool {
        self.azure_async_operation.is_some() || self.location.is_some()
    }
}

/// `properties.provisioningState` of a resource body, if present.
pub fn provisioning_state(body: &Value) -> Option<OperationStatus> {
    body.pointer("/properties/provisioningState")
        .and_then(Value::as_str)
        .map(OperationStatus::parse)
}

/// Status plus failure message from an `Azure-AsyncOperation` status body.
pub fn async_operation_status(body: &Value) -> (OperationStatus, Option<String>) {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .map(OperationStatus::parse)
        .unwrap_or(OperationStatus::InProgress);
    let message = body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string);
    (status, message)
}
