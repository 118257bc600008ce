//! Credential resolution and token acquisition.
//!
//! Credentials are resolved in the order Ansible's Azure modules use:
//!
//! 1. Module parameters (`subscription_id`, `client_id`, `secret`, `tenant`)
//! 2. Environment variables (`AZURE_SUBSCRIPTION_ID`, `AZURE_CLIENT_ID`,
//!    `AZURE_SECRET`, `AZURE_TENANT`, `AZURE_PROFILE`)
//! 3. A profile in `~/.azure/credentials` (INI, `[default]` unless `profile` is set)
//! 4. Azure CLI (`az login`)
//!
//! `auth_source` pins one of these (`env`, `credential_file`, `cli`, `msi`);
//! `auto` walks the chain and stops at the first source that yields a
//! service principal, falling back to the CLI.

use super::cloud::CloudEnvironment;
use super::error::{ArmError, ArmResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Managed identity endpoint on Azure hosts.
const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// A bearer token and its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// Whether the token is still usable with the refresh margin applied.
    pub fn is_fresh(&self) -> bool {
        self.expires_on - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) > Utc::now()
    }
}

/// Anything that can mint a bearer token for a scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs.
    fn kind(&self) -> &'static str;

    async fn get_token(&self, scope: &str) -> ArmResult<AccessToken>;
}

/// Where credentials come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthSource {
    #[default]
    Auto,
    Env,
    CredentialFile,
    Cli,
    Msi,
}

impl fmt::Display for AuthSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthSource::Auto => write!(f, "auto"),
            AuthSource::Env => write!(f, "env"),
            AuthSource::CredentialFile => write!(f, "credential_file"),
            AuthSource::Cli => write!(f, "cli"),
            AuthSource::Msi => write!(f, "msi"),
        }
    }
}

impl FromStr for AuthSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(AuthSource::Auto),
            "env" => Ok(AuthSource::Env),
            "credential_file" => Ok(AuthSource::CredentialFile),
            "cli" => Ok(AuthSource::Cli),
            "msi" => Ok(AuthSource::Msi),
            _ => Err(format!(
                "Invalid auth_source '{}'. Valid values: auto, env, credential_file, cli, msi",
                s
            )),
        }
    }
}

/// Authentication-related module options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthOptions {
    pub subscription_id: Option<String>,
    pub client_id: Option<String>,
    pub secret: Option<String>,
    pub tenant: Option<String>,
    pub profile: Option<String>,
    #[serde(default)]
    pub auth_source: Option<AuthSource>,
    pub cloud_environment: Option<String>,
}

/// Service principal settings gathered from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    pub subscription_id: Option<String>,
    pub client_id: Option<String>,
    pub secret: Option<String>,
    pub tenant: Option<String>,
}

impl CredentialSet {
    fn has_service_principal(&self) -> bool {
        self.client_id.is_some() && self.secret.is_some() && self.tenant.is_some()
    }

    /// Fill unset fields from `other`.
    fn or(self, other: CredentialSet) -> CredentialSet {
        CredentialSet {
            subscription_id: self.subscription_id.or(other.subscription_id),
            client_id: self.client_id.or(other.client_id),
            secret: self.secret.or(other.secret),
            tenant: self.tenant.or(other.tenant),
        }
    }

    fn from_options(options: &AuthOptions) -> Self {
        Self {
            subscription_id: options.subscription_id.clone(),
            client_id: options.client_id.clone(),
            secret: options.secret.clone(),
            tenant: options.tenant.clone(),
        }
    }

    /// Read the `AZURE_*` environment variables.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            subscription_id: var("AZURE_SUBSCRIPTION_ID"),
            client_id: var("AZURE_CLIENT_ID"),
            secret: var("AZURE_SECRET").or_else(|| var("AZURE_CLIENT_SECRET")),
            tenant: var("AZURE_TENANT").or_else(|| var("AZURE_TENANT_ID")),
        }
    }

    /// Read one profile from an INI credentials file.
    pub fn from_credential_file(path: &std::path::Path, profile: &str) -> ArmResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::new(
                &path.to_string_lossy(),
                config::FileFormat::Ini,
            ))
            .build()
            .map_err(|e| {
                ArmError::Authentication(format!(
                    "Failed to read credentials file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let section: std::collections::HashMap<String, String> =
            settings.get(profile).map_err(|_| {
                ArmError::Authentication(format!(
                    "Profile '{}' not found in {}",
                    profile,
                    path.display()
                ))
            })?;

        Ok(Self {
            subscription_id: section.get("subscription_id").cloned(),
            client_id: section.get("client_id").cloned(),
            secret: section.get("secret").cloned(),
            tenant: section.get("tenant").cloned(),
        })
    }
}

/// Default location of the Azure credentials file.
pub fn default_credential_file() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".azure").join("credentials"))
}

/// Outcome of credential resolution.
pub struct ResolvedCredential {
    pub credential: Arc<dyn TokenCredential>,
    pub subscription_id: String,
}

/// Resolve module options into a token credential and a subscription.
pub async fn resolve_credential(
    options: &AuthOptions,
    cloud: &CloudEnvironment,
    http: &reqwest::Client,
) -> ArmResult<ResolvedCredential> {
    let source = options.auth_source.unwrap_or_default();
    let params = CredentialSet::from_options(options);
    let profile = options
        .profile
        .clone()
        .or_else(|| std::env::var("AZURE_PROFILE").ok())
        .unwrap_or_else(|| "default".to_string());

    let from_file = || -> ArmResult<CredentialSet> {
        match default_credential_file() {
            Some(path) if path.exists() => CredentialSet::from_credential_file(&path, &profile),
            _ => Ok(CredentialSet::default()),
        }
    };

    let merged = match source {
        AuthSource::Env => params.or(CredentialSet::from_env()),
        AuthSource::CredentialFile => params.or(from_file()?),
        AuthSource::Cli | AuthSource::Msi => params,
        AuthSource::Auto => {
            let env = params.clone().or(CredentialSet::from_env());
            if env.has_service_principal() {
                env
            } else {
                env.or(from_file().unwrap_or_default())
            }
        }
    };

    debug!("Resolving Azure credentials with auth_source={}", source);

    match source {
        AuthSource::Msi => {
            let credential = ManagedIdentityCredential::new(http.clone(), merged.client_id.clone());
            let subscription_id = merged.subscription_id.ok_or_else(|| {
                ArmError::Authentication(
                    "subscription_id is required with auth_source=msi".to_string(),
                )
            })?;
            Ok(ResolvedCredential {
                credential: Arc::new(credential),
                subscription_id,
            })
        }
        AuthSource::Cli => cli_credential(merged.subscription_id).await,
        _ if merged.has_service_principal() => {
            let subscription_id = merged.subscription_id.clone().ok_or_else(|| {
                ArmError::Authentication(
                    "subscription_id is required for service principal authentication".to_string(),
                )
            })?;
            info!("Using service principal credentials for tenant {:?}", merged.tenant);
            let credential = ClientSecretCredential::new(
                http.clone(),
                &cloud.active_directory,
                merged.tenant.unwrap_or_default(),
                merged.client_id.unwrap_or_default(),
                merged.secret.unwrap_or_default(),
            );
            Ok(ResolvedCredential {
                credential: Arc::new(credential),
                subscription_id,
            })
        }
        AuthSource::Auto => cli_credential(merged.subscription_id).await,
        other => Err(ArmError::Authentication(format!(
            "auth_source={} did not provide client_id, secret and tenant",
            other
        ))),
    }
}

async fn cli_credential(subscription_id: Option<String>) -> ArmResult<ResolvedCredential> {
    let subscription_id = match subscription_id {
        Some(id) => id,
        None => AzureCliCredential::default_subscription().await?,
    };
    info!("Using Azure CLI credentials for subscription {}", subscription_id);
    Ok(ResolvedCredential {
        credential: Arc::new(AzureCliCredential::new()),
        subscription_id,
    })
}

// ============================================================================
// Credential implementations
// ============================================================================

/// A fixed token, typically from `AZURE_ACCESS_TOKEN` or tests.
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn kind(&self) -> &'static str {
        "static"
    }

    async fn get_token(&self, _scope: &str) -> ArmResult<AccessToken> {
        Ok(AccessToken::new(
            self.token.clone(),
            Utc::now() + ChronoDuration::hours(1),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    /// Seconds; IMDS returns this as a string.
    #[serde(default)]
    expires_in: serde_json::Value,
}

impl OAuthTokenResponse {
    fn into_token(self) -> AccessToken {
        let seconds = match &self.expires_in {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
        .unwrap_or(3600);
        AccessToken::new(self.access_token, Utc::now() + ChronoDuration::seconds(seconds))
    }
}

/// Service principal client-credentials flow.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    secret: String,
    cache: Mutex<Option<AccessToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        authority: &str,
        tenant: String,
        client_id: String,
        secret: String,
    ) -> Self {
        Self {
            http,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                authority.trim_end_matches('/'),
                tenant
            ),
            client_id,
            secret,
            cache: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn kind(&self) -> &'static str {
        "client_secret"
    }

    async fn get_token(&self, scope: &str) -> ArmResult<AccessToken> {
        if let Some(token) = self.cache.lock().as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.clone());
        }

        debug!("Requesting service principal token from {}", self.token_url);
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.secret.as_str()),
                ("scope", scope),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ArmError::Authentication(format!(
                "token endpoint returned {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let token = serde_json::from_str::<OAuthTokenResponse>(&body)?.into_token();
        *self.cache.lock() = Some(token.clone());
        Ok(token)
    }
}

/// Managed identity through the instance metadata service.
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    client_id: Option<String>,
    cache: Mutex<Option<AccessToken>>,
}

impl ManagedIdentityCredential {
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        Self {
            http,
            client_id,
            cache: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn kind(&self) -> &'static str {
        "msi"
    }

    async fn get_token(&self, scope: &str) -> ArmResult<AccessToken> {
        if let Some(token) = self.cache.lock().as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.clone());
        }

        let resource = scope.trim_end_matches(".default");
        let mut query = vec![("api-version", "2018-02-01"), ("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let response = self
            .http
            .get(IMDS_TOKEN_ENDPOINT)
            .query(&query)
            .header("Metadata", "true")
            .send()
            .await
            .map_err(|e| ArmError::Authentication(format!("managed identity unavailable: {}", e)))?;

        if !response.status().is_success() {
            return Err(ArmError::Authentication(format!(
                "managed identity endpoint returned {}",
                response.status()
            )));
        }

        let token = response.json::<OAuthTokenResponse>().await?.into_token();
        *self.cache.lock() = Some(token.clone());
        Ok(token)
    }
}

/// Delegates to `az account get-access-token`.
pub struct AzureCliCredential {
    cache: Mutex<Option<AccessToken>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    expires_on: String,
}

#[derive(Debug, Deserialize)]
struct CliAccount {
    id: String,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(None),
        }
    }

    async fn run_az(args: &[&str]) -> ArmResult<Vec<u8>> {
        let output = tokio::process::Command::new("az")
            .args(args)
            .arg("--output")
            .arg("json")
            .output()
            .await
            .map_err(|e| ArmError::Authentication(format!("failed to run az CLI: {}", e)))?;

        if !output.status.success() {
            return Err(ArmError::Authentication(format!(
                "az {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    /// Subscription selected with `az account set`.
    pub async fn default_subscription() -> ArmResult<String> {
        let stdout = Self::run_az(&["account", "show"]).await?;
        Ok(serde_json::from_slice::<CliAccount>(&stdout)?.id)
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the CLI's local-time `expiresOn` ("2024-01-01 12:00:00.000000").
fn parse_cli_expiry(raw: &str) -> Option<DateTime<Utc>> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| chrono::Local.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn kind(&self) -> &'static str {
        "cli"
    }

    async fn get_token(&self, scope: &str) -> ArmResult<AccessToken> {
        if let Some(token) = self.cache.lock().as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.clone());
        }

        let resource = scope.trim_end_matches(".default");
        let stdout = Self::run_az(&["account", "get-access-token", "--resource", resource]).await?;
        let cli_token: CliToken = serde_json::from_slice(&stdout)?;
        let expires_on = parse_cli_expiry(&cli_token.expires_on)
            .unwrap_or_else(|| Utc::now() + ChronoDuration::minutes(10));

        let token = AccessToken::new(cli_token.access_token, expires_on);
        *self.cache.lock() = Some(token.clone());
        Ok(token)
    }
}
