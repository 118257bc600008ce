//! Error types for the ARM client layer.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for ARM client operations.
pub type ArmResult<T> = Result<T, ArmError>;

/// Errors raised while talking to Azure Resource Manager.
#[derive(Error, Debug)]
pub enum ArmError {
    /// Transport-level failure (DNS, TLS, connection reset, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// ARM answered with a non-success status.
    #[error("Azure API error (HTTP {status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Token acquisition failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A long-running operation finished in a non-success terminal state.
    #[error("Long-running operation {status}: {message}")]
    OperationFailed { status: String, message: String },

    /// A long-running operation did not finish in time.
    #[error("Timed out after {timeout:?} waiting for {operation}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// The service returned something we could not interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A string could not be parsed as an ARM resource id.
    #[error("Invalid resource ID '{0}'")]
    InvalidResourceId(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArmError {
    /// Build an API error from a status code and the raw response body.
    ///
    /// ARM wraps failures in `{"error": {"code": .., "message": ..}}`; anything
    /// else is reported verbatim.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => ArmError::Api {
                status,
                code: envelope.error.code,
                message: envelope.error.message,
            },
            Err(_) => ArmError::Api {
                status,
                code: "Unknown".to_string(),
                message: if body.is_empty() {
                    "no response body".to_string()
                } else {
                    body.chars().take(500).collect()
                },
            },
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ArmError::Api { status, .. } => Some(*status),
            ArmError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the transport retry policy should try the request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ArmError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ArmError::Api { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Statuses ARM documents as transient.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
