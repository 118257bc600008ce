//! Configuration for azure-rm.
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/azure-rm/config.toml)
//! - User configuration (~/.azure-rm/config.toml)
//! - Project configuration (./azure-rm.toml)
//! - Environment variables (`AZURE_RM_*`)
//! - Command-line arguments
//!
//! Files are TOML, YAML or JSON by extension and are deep-merged in order, so
//! a later file only needs to name the keys it changes.

use crate::azure::auth::AuthSource;
use crate::azure::lro::PollerConfig;
use crate::error::{Error, Result};
use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Azure connection settings
    pub azure: AzureSettings,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Colors and output settings
    pub output: OutputConfig,
}

/// Settings used when building an ARM client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    /// Cloud used when a module does not pass `cloud_environment`
    pub cloud_environment: String,

    /// Credential source used when a module does not pass `auth_source`
    pub auth_source: AuthSource,

    /// Subscription used when neither the module nor the environment names one
    pub subscription_id: Option<String>,

    /// Resource Manager endpoint override (private clouds, test doubles)
    pub endpoint: Option<String>,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Transport retry policy
    pub retry: RetryPolicy,

    /// Long-running operation polling
    pub poller: PollerConfig,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            cloud_environment: "AzureCloud".to_string(),
            auth_source: AuthSource::Auto,
            subscription_id: None,
            endpoint: None,
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            poller: PollerConfig::default(),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Enable colors in human output
    pub colors: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { colors: true }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut merged = serde_json::to_value(Config::default())?;

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                debug!("Loading configuration from {}", path.display());
                deep_merge(&mut merged, Self::read_file(&path)?);
            }
        }

        let mut config: Config = serde_json::from_value(merged).map_err(|e| {
            Error::InvalidConfig(e.to_string())
        })?;

        // Apply environment variable overrides
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load a single file on top of the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut merged = serde_json::to_value(Config::default())?;
        deep_merge(&mut merged, Self::read_file(path.as_ref())?);
        serde_json::from_value(merged).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path takes priority
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }
        if let Ok(env_config) = std::env::var("AZURE_RM_CONFIG") {
            return vec![PathBuf::from(env_config)];
        }

        let mut paths = vec![PathBuf::from("/etc/azure-rm/config.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".azure-rm/config.toml"));
        }
        paths.push(PathBuf::from("azure-rm.toml"));
        paths
    }

    fn read_file(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let parse_error = |message: String| Error::Config {
            path: path.to_path_buf(),
            message,
        };

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string())),
            "json" => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
            _ => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let duration = |name: &str, raw: String| {
            humantime_serde::re::humantime::parse_duration(&raw)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", name, e)))
        };

        if let Some(cloud) = var("AZURE_RM_CLOUD_ENVIRONMENT") {
            self.azure.cloud_environment = cloud;
        }
        if let Some(source) = var("AZURE_RM_AUTH_SOURCE") {
            self.azure.auth_source = source.parse().map_err(Error::InvalidConfig)?;
        }
        if let Some(subscription) = var("AZURE_RM_SUBSCRIPTION_ID") {
            self.azure.subscription_id = Some(subscription);
        }
        if let Some(endpoint) = var("AZURE_RM_ENDPOINT") {
            self.azure.endpoint = Some(endpoint);
        }
        if let Some(timeout) = var("AZURE_RM_REQUEST_TIMEOUT") {
            self.azure.request_timeout = duration("AZURE_RM_REQUEST_TIMEOUT", timeout)?;
        }
        if let Some(retries) = var("AZURE_RM_MAX_RETRIES") {
            self.azure.retry.max_retries = retries
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("AZURE_RM_MAX_RETRIES: '{}' is not a number", retries)))?;
        }
        if let Some(interval) = var("AZURE_RM_POLL_INTERVAL") {
            self.azure.poller.interval = duration("AZURE_RM_POLL_INTERVAL", interval)?;
        }
        if let Some(timeout) = var("AZURE_RM_POLL_TIMEOUT") {
            self.azure.poller.timeout = duration("AZURE_RM_POLL_TIMEOUT", timeout)?;
        }
        if let Some(level) = var("AZURE_RM_LOG_LEVEL") {
            self.logging.level = level.parse::<LogLevel>().map_err(Error::InvalidConfig)?;
        }
        if let Some(format) = var("AZURE_RM_LOG_FORMAT") {
            self.logging.format = format.parse::<LogFormat>().map_err(Error::InvalidConfig)?;
        }
        if let Some(path) = var("AZURE_RM_LOG_PATH") {
            self.logging.file = Some(PathBuf::from(path));
        }
        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() || std::env::var("AZURE_RM_NO_COLOR").is_ok() {
            self.output.colors = false;
            self.logging.ansi_colors = false;
        }
        Ok(())
    }
}

/// Merge `overlay` into `base`; objects merge key by key, anything else replaces.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.azure.cloud_environment, "AzureCloud");
        assert_eq!(config.azure.auth_source, AuthSource::Auto);
        assert_eq!(config.azure.request_timeout, Duration::from_secs(60));
        assert!(config.output.colors);
    }

    #[test]
    fn test_deep_merge() {
        let mut base = json!({"azure": {"cloud_environment": "AzureCloud", "retry": {"max_retries": 4}}});
        deep_merge(&mut base, json!({"azure": {"retry": {"max_retries": 1}}}));
        assert_eq!(base["azure"]["cloud_environment"], "AzureCloud");
        assert_eq!(base["azure"]["retry"]["max_retries"], 1);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[azure]\ncloud_environment = \"AzureChinaCloud\"\nrequest_timeout = \"2m\"\n\n[azure.poller]\ninterval = \"500ms\""
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.azure.cloud_environment, "AzureChinaCloud");
        assert_eq!(config.azure.request_timeout, Duration::from_secs(120));
        assert_eq!(config.azure.poller.interval, Duration::from_millis(500));
        // Untouched keys keep their defaults.
        assert_eq!(config.azure.poller.timeout, PollerConfig::default().timeout);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "azure:\n  auth_source: cli\nlogging:\n  format: json").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.azure.auth_source, AuthSource::Cli);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[azure\nbroken").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("AZURE_RM_AUTH_SOURCE", "msi");
        std::env::set_var("AZURE_RM_POLL_TIMEOUT", "10m");
        let mut config = Config::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.azure.auth_source, AuthSource::Msi);
        assert_eq!(config.azure.poller.timeout, Duration::from_secs(600));
        std::env::remove_var("AZURE_RM_AUTH_SOURCE");
        std::env::remove_var("AZURE_RM_POLL_TIMEOUT");
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_bad_values() {
        std::env::set_var("AZURE_RM_MAX_RETRIES", "lots");
        let mut config = Config::default();
        assert!(config.apply_env_overrides().is_err());
        std::env::remove_var("AZURE_RM_MAX_RETRIES");
    }
}
