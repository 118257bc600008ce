//! # azure-rm - declarative Azure Resource Manager modules
//!
//! Each supported Azure resource is exposed as two modules: a management
//! module that drives the resource to `state=present|absent`, and an `_info`
//! module that reads it.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 CLI (clap: list / doc / run)                 │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │   Module registry  (ArgSpec validation, redacted logging)    │
//! └──────────────────────────────────────────────────────────────┘
//!          │                                         │
//!          ▼                                         ▼
//! ┌─────────────────────────┐         ┌──────────────────────────┐
//! │ management: plan and    │         │ info: route selection    │
//! │ reconcile, compare      │         │ and read dispatch        │
//! └─────────────────────────┘         └──────────────────────────┘
//!          │                                         │
//!          └────────────────────┬────────────────────┘
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ArmClient (reqwest, bearer token, retry, LRO polling)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use azure_rm::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = ModuleRegistry::with_builtins();
//!     let mut params = ModuleParams::new();
//!     params.insert("name".into(), "rg-demo".into());
//!     params.insert("location".into(), "westeurope".into());
//!
//!     let output = registry
//!         .execute("azure_rm_resourcegroup", &params, &ModuleContext::new())
//!         .await
//!         .map_err(|e| Error::from_module("azure_rm_resourcegroup", e))?;
//!     println!("{}", output.msg);
//!     Ok(())
//! }
//! ```

// Re-export commonly used items in prelude
pub mod prelude {
    //! Common imports for driving modules from Rust code.

    pub use crate::azure::{ArmClient, ArmError, HttpArmClient, MockArmClient};
    pub use crate::config::{AzureSettings, Config};
    pub use crate::error::{Error, Result};
    pub use crate::modules::{
        Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleRegistry, ModuleResult,
    };
    pub use crate::schema::{ArgSpec, OptionSpec, ValidatedArgs};
}

// ============================================================================
// Core
// ============================================================================

/// Error types and result aliases.
///
/// [`Error`](error::Error) is what the CLI reports; module and client errors
/// convert into it with their exit-code classification.
pub mod error;

/// Layered configuration: files, then `AZURE_RM_*` environment overrides.
pub mod config;

/// `tracing` subscriber setup.
pub mod logging;

/// Retry policy with backoff and jitter, used by the HTTP client.
pub mod retry;

// ============================================================================
// Azure
// ============================================================================

/// ARM client layer.
///
/// The [`ArmClient`](azure::ArmClient) trait, its `reqwest` implementation
/// with credential resolution and long-running operation polling, and an
/// in-memory mock.
pub mod azure;

/// Argument schemas, body inflation and structural comparison.
pub mod schema;

/// Modules and the registry that runs them.
pub mod modules;

/// Static descriptors of the supported Azure resources.
pub mod resources;

// ============================================================================
// Interface
// ============================================================================

/// Command-line interface.
pub mod cli;

/// Returns the current version of azure-rm.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
