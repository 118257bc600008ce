//! ARM management client.
//!
//! [`ArmClient`] is the capability every module is written against. The
//! production implementation, [`HttpArmClient`], speaks ARM REST over
//! `reqwest` and takes care of:
//!
//! - Bearer tokens from a [`TokenCredential`]
//! - Transport retries for throttling and transient server errors
//! - `nextLink` pagination on list calls
//! - Long-running operation polling on PUT and DELETE

use super::auth::{resolve_credential, AuthOptions, TokenCredential};
use super::cloud::CloudEnvironment;
use super::error::{is_retryable_status, ArmError, ArmResult};
use super::lro::{async_operation_status, provisioning_state, LroHeaders, OperationStatus, PollerConfig};
use crate::config::AzureSettings;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Operations the modules need from Azure Resource Manager.
///
/// Paths are ARM resource paths (`/subscriptions/...`), the client adds the
/// endpoint and the `api-version` query parameter.
#[async_trait]
pub trait ArmClient: Send + Sync {
    /// Subscription all relative paths are rendered against.
    fn subscription_id(&self) -> &str;

    /// Fetch one resource. `Ok(None)` means ARM answered 404.
    async fn get(&self, path: &str, api_version: &str) -> ArmResult<Option<Value>>;

    /// Fetch every item of a collection, following `nextLink`.
    async fn list(&self, path: &str, api_version: &str) -> ArmResult<Vec<Value>>;

    /// Create or replace a resource and wait for the operation to finish.
    async fn put(&self, path: &str, api_version: &str, body: &Value) -> ArmResult<Value>;

    /// Delete a resource and wait for the operation to finish.
    ///
    /// Deleting something that is already gone succeeds.
    async fn delete(&self, path: &str, api_version: &str) -> ArmResult<()>;
}

/// Raw response as seen by the polling logic.
#[derive(Debug)]
struct RawResponse {
    status: u16,
    headers: LroHeaders,
    body: Value,
    text: String,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn into_error(self) -> ArmError {
        ArmError::from_response(self.status, &self.text)
    }
}

/// One failed attempt, with the server's `Retry-After` hint if it sent one.
struct AttemptError {
    error: ArmError,
    retry_after: Option<Duration>,
}

impl From<ArmError> for AttemptError {
    fn from(error: ArmError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Builder for [`HttpArmClient`].
pub struct HttpArmClientBuilder {
    endpoint: String,
    scope: String,
    subscription_id: String,
    credential: Arc<dyn TokenCredential>,
    retry: RetryPolicy,
    poller: PollerConfig,
    timeout: Duration,
    user_agent: String,
}

impl HttpArmClientBuilder {
    pub fn new(subscription_id: impl Into<String>, credential: Arc<dyn TokenCredential>) -> Self {
        let cloud = CloudEnvironment::default();
        Self {
            endpoint: cloud.resource_manager.clone(),
            scope: cloud.scope(),
            subscription_id: subscription_id.into(),
            credential,
            retry: RetryPolicy::default(),
            poller: PollerConfig::default(),
            timeout: Duration::from_secs(60),
            user_agent: format!("azure-rm/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Target a sovereign cloud.
    pub fn cloud(mut self, cloud: &CloudEnvironment) -> Self {
        self.endpoint = cloud.resource_manager.clone();
        self.scope = cloud.scope();
        self
    }

    /// Override the Resource Manager endpoint (private clouds, tests).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ArmResult<HttpArmClient> {
        let http = Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?;
        Ok(HttpArmClient {
            http,
            endpoint: self.endpoint.trim_end_matches('/').to_string(),
            scope: self.scope,
            subscription_id: self.subscription_id,
            credential: self.credential,
            retry: self.retry,
            poller: self.poller,
        })
    }
}

/// [`ArmClient`] backed by the ARM REST API.
pub struct HttpArmClient {
    http: Client,
    endpoint: String,
    scope: String,
    subscription_id: String,
    credential: Arc<dyn TokenCredential>,
    retry: RetryPolicy,
    poller: PollerConfig,
}

impl HttpArmClient {
    pub fn builder(
        subscription_id: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> HttpArmClientBuilder {
        HttpArmClientBuilder::new(subscription_id, credential)
    }

    /// Resolve credentials from module options and settings, then build a client.
    pub async fn connect(options: &AuthOptions, settings: &AzureSettings) -> ArmResult<Self> {
        let cloud: CloudEnvironment = options
            .cloud_environment
            .as_deref()
            .unwrap_or(&settings.cloud_environment)
            .parse()
            .map_err(ArmError::Authentication)?;

        let mut options = options.clone();
        if options.auth_source.is_none() {
            options.auth_source = Some(settings.auth_source);
        }
        if options.subscription_id.is_none() {
            options.subscription_id = settings.subscription_id.clone();
        }

        let token_http = Client::builder().timeout(settings.request_timeout).build()?;
        let resolved = resolve_credential(&options, &cloud, &token_http).await?;
        info!(
            "Connecting to {} (subscription {}) with {} credentials",
            cloud,
            resolved.subscription_id,
            resolved.credential.kind()
        );

        let mut builder = HttpArmClientBuilder::new(resolved.subscription_id, resolved.credential)
            .cloud(&cloud)
            .retry(settings.retry.clone())
            .poller(settings.poller.clone())
            .timeout(settings.request_timeout);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint(endpoint.clone());
        }
        builder.build()
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        let base = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.endpoint, path)
        };
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{}{}api-version={}", base, separator, api_version)
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<RawResponse, AttemptError> {
        let token = self.credential.get_token(&self.scope).await?;

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&token.token)
            .header("Accept", "application/json")
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ArmError::from)?;
        let status = response.status().as_u16();
        let headers = LroHeaders::from_headers(response.headers());
        let text = response.text().await.map_err(ArmError::from)?;

        if is_retryable_status(status) {
            return Err(AttemptError {
                error: ArmError::from_response(status, &text),
                retry_after: headers.retry_after,
            });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()))
        };

        Ok(RawResponse {
            status,
            headers,
            body,
            text,
        })
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> ArmResult<RawResponse> {
        debug!("{} {}", method, url);
        self.retry
            .execute(
                || self.attempt(method.clone(), url, body),
                |e: &AttemptError| e.error.is_retryable(),
                |e: &AttemptError| e.retry_after,
            )
            .await
            .map_err(|e| e.error)
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.poller.timeout
    }

    async fn wait(&self, deadline: Instant, hint: Option<Duration>, operation: &str) -> ArmResult<()> {
        if Instant::now() >= deadline {
            return Err(ArmError::Timeout {
                operation: operation.to_string(),
                timeout: self.poller.timeout,
            });
        }
        tokio::time::sleep(hint.unwrap_or(self.poller.interval)).await;
        Ok(())
    }

    /// Poll an `Azure-AsyncOperation` status URL until it is terminal.
    async fn poll_async_operation(
        &self,
        status_url: &str,
        first_hint: Option<Duration>,
        operation: &str,
    ) -> ArmResult<()> {
        let deadline = self.deadline();
        let mut hint = first_hint;

        loop {
            self.wait(deadline, hint, operation).await?;
            let response = self.send(Method::GET, status_url, None).await?;
            if !response.is_success() {
                return Err(response.into_error());
            }

            let (status, message) = async_operation_status(&response.body);
            debug!("{} status: {:?}", operation, status);
            match status {
                OperationStatus::Succeeded => return Ok(()),
                OperationStatus::Failed | OperationStatus::Canceled => {
                    return Err(ArmError::OperationFailed {
                        status: format!("{:?}", status),
                        message: message.unwrap_or_else(|| operation.to_string()),
                    })
                }
                OperationStatus::InProgress => hint = response.headers.retry_after,
            }
        }
    }

    /// Poll a `Location` URL until it stops answering 202.
    async fn poll_location(
        &self,
        location: &str,
        first_hint: Option<Duration>,
        operation: &str,
    ) -> ArmResult<Value> {
        let deadline = self.deadline();
        let mut hint = first_hint;

        loop {
            self.wait(deadline, hint, operation).await?;
            let response = self.send(Method::GET, location, None).await?;
            match response.status {
                202 => hint = response.headers.retry_after,
                s if (200..300).contains(&s) => return Ok(response.body),
                _ => return Err(response.into_error()),
            }
        }
    }

    /// Re-read a resource until its provisioning state is terminal.
    async fn poll_provisioning_state(&self, path: &str, api_version: &str) -> ArmResult<Value> {
        let deadline = self.deadline();
        let operation = format!("provisioning of {}", path);

        loop {
            self.wait(deadline, None, &operation).await?;
            let body = self.get(path, api_version).await?.ok_or_else(|| {
                ArmError::InvalidResponse(format!("{} disappeared while provisioning", path))
            })?;
            match provisioning_state(&body) {
                Some(OperationStatus::InProgress) => continue,
                Some(OperationStatus::Failed) | Some(OperationStatus::Canceled) => {
                    return Err(ArmError::OperationFailed {
                        status: "Failed".to_string(),
                        message: format!("{} ended in a failed provisioning state", path),
                    })
                }
                _ => return Ok(body),
            }
        }
    }

    async fn get_after_operation(&self, path: &str, api_version: &str) -> ArmResult<Value> {
        self.get(path, api_version).await?.ok_or_else(|| {
            ArmError::InvalidResponse(format!("{} not found after the operation completed", path))
        })
    }
}

#[async_trait]
impl ArmClient for HttpArmClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn get(&self, path: &str, api_version: &str) -> ArmResult<Option<Value>> {
        let response = self.send(Method::GET, &self.url(path, api_version), None).await?;
        match response.status {
            404 => Ok(None),
            s if (200..300).contains(&s) => Ok(Some(response.body)),
            _ => Err(response.into_error()),
        }
    }

    async fn list(&self, path: &str, api_version: &str) -> ArmResult<Vec<Value>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path, api_version));

        while let Some(url) = next.take() {
            let response = self.send(Method::GET, &url, None).await?;
            if !response.is_success() {
                return Err(response.into_error());
            }

            match response.body.get("value") {
                Some(Value::Array(page)) => items.extend(page.iter().cloned()),
                Some(_) => {
                    return Err(ArmError::InvalidResponse(format!(
                        "'value' in the list response for {} is not an array",
                        path
                    )))
                }
                None => {}
            }

            next = response
                .body
                .get("nextLink")
                .and_then(Value::as_str)
                .filter(|link| !link.is_empty())
                .map(str::to_string);
        }

        debug!("Listed {} items from {}", items.len(), path);
        Ok(items)
    }

    async fn put(&self, path: &str, api_version: &str, body: &Value) -> ArmResult<Value> {
        let response = self
            .send(Method::PUT, &self.url(path, api_version), Some(body))
            .await?;
        if !response.is_success() {
            return Err(response.into_error());
        }

        let operation = format!("PUT {}", path);
        if let Some(status_url) = &response.headers.azure_async_operation {
            self.poll_async_operation(status_url, response.headers.retry_after, &operation)
                .await?;
            return self.get_after_operation(path, api_version).await;
        }
        if response.status == 202 {
            if let Some(location) = &response.headers.location {
                self.poll_location(location, response.headers.retry_after, &operation)
                    .await?;
            }
            return self.get_after_operation(path, api_version).await;
        }
        if provisioning_state(&response.body) == Some(OperationStatus::InProgress) {
            return self.poll_provisioning_state(path, api_version).await;
        }
        Ok(response.body)
    }

    async fn delete(&self, path: &str, api_version: &str) -> ArmResult<()> {
        let response = self
            .send(Method::DELETE, &self.url(path, api_version), None)
            .await?;
        if response.status == 404 {
            return Ok(());
        }
        if !response.is_success() {
            return Err(response.into_error());
        }

        let operation = format!("DELETE {}", path);
        if let Some(status_url) = &response.headers.azure_async_operation {
            self.poll_async_operation(status_url, response.headers.retry_after, &operation)
                .await?;
        } else if response.status == 202 {
            if let Some(location) = &response.headers.location {
                self.poll_location(location, response.headers.retry_after, &operation)
                    .await?;
            }
        }
        Ok(())
    }
}
