//! Error types for azure-rm.
//!
//! Three layers: [`ArmError`](crate::azure::ArmError) for the ARM client,
//! [`ModuleError`](crate::modules::ModuleError) for module execution, and
//! [`Error`] for everything the CLI deals with.

use crate::modules::ModuleError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Error loading a configuration file.
    #[error("Failed to load configuration from '{path}': {message}")]
    Config {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration parsed but is not usable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Module Errors
    // ========================================================================
    /// Module not found.
    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    /// Invalid module arguments.
    #[error("Invalid arguments for module '{module}': {message}")]
    ModuleArgs {
        /// Module name
        module: String,
        /// Error message
        message: String,
    },

    /// Module execution failed.
    #[error("Module '{module}' execution failed: {message}")]
    ModuleExecution {
        /// Module name
        module: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // I/O and Serialization Errors
    // ========================================================================
    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new module args error.
    pub fn module_args(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModuleArgs {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Classify a module error raised while running `module`.
    pub fn from_module(module: &str, error: ModuleError) -> Self {
        match error {
            ModuleError::NotFound(name) => Self::ModuleNotFound(name),
            ModuleError::InvalidParameter(_) | ModuleError::MissingParameter(_) => {
                Self::module_args(module, error.to_string())
            }
            other => Self::ModuleExecution {
                module: module.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Returns true when the failure is the caller's input rather than Azure.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Error::ModuleArgs { .. } | Error::ModuleNotFound(_))
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        if self.is_usage_error() {
            2
        } else {
            1
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_error_classification() {
        let err = Error::from_module(
            "azure_rm_resourcegroup",
            ModuleError::MissingParameter("name".to_string()),
        );
        assert!(err.is_usage_error());
        assert_eq!(err.exit_code(), 2);

        let err = Error::from_module(
            "azure_rm_resourcegroup",
            ModuleError::ExecutionFailed("boom".to_string()),
        );
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_error_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result.context("reading arguments").unwrap_err();
        assert_eq!(err.to_string(), "reading arguments");
    }
}
