//! Run command - execute one module

use super::CommandContext;
use crate::error::{Error, ErrorContext, Result};
use crate::modules::{ModuleContext, ModuleOutput, ModuleParams};
use clap::Parser;
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, error};

/// Arguments for the run command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Module name
    pub module: String,

    /// JSON or YAML file with the module arguments, `-` for stdin
    #[arg(long)]
    pub args: Option<PathBuf>,

    /// Module argument as key=value; inline `[..]` and `{..}` values are parsed as YAML
    #[arg(short = 'a', long = "arg", action = clap::ArgAction::Append)]
    pub arg: Vec<String>,

    /// Report what would change without changing anything
    #[arg(long = "check")]
    pub check_mode: bool,

    /// Attach a before/after diff to the result
    #[arg(long = "diff")]
    pub diff_mode: bool,
}

/// Value of a `key=value` pair.
///
/// Scalars stay strings and are typed by the argument spec; only inline
/// YAML lists and mappings are parsed.
fn pair_value(raw: &str) -> Value {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_yaml::from_str::<Value>(raw) {
            return value;
        }
    }
    Value::String(raw.to_string())
}

impl RunArgs {
    /// Collect module parameters from the args file and `-a` pairs.
    pub fn params(&self) -> Result<ModuleParams> {
        let mut params = ModuleParams::new();

        if let Some(path) = &self.args {
            let content = if path.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read module arguments from stdin")?;
                buf
            } else {
                std::fs::read_to_string(path).map_err(|e| {
                    Error::module_args(&self.module, format!("cannot read {}: {}", path.display(), e))
                })?
            };
            // YAML is a superset of JSON.
            let parsed: Value = serde_yaml::from_str(&content)
                .map_err(|e| Error::module_args(&self.module, format!("cannot parse arguments: {}", e)))?;
            match parsed {
                Value::Object(map) => params.extend(map),
                Value::Null => {}
                _ => {
                    return Err(Error::module_args(
                        &self.module,
                        "arguments file must contain a mapping",
                    ))
                }
            }
        }

        for pair in &self.arg {
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| Error::module_args(&self.module, format!("expected key=value, got '{}'", pair)))?;
            params.insert(key.to_string(), pair_value(raw));
        }

        Ok(params)
    }

    /// Execute the run command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let params = match self.params() {
            Ok(params) => params,
            Err(e) => return self.report_error(ctx, e),
        };
        let context = ModuleContext::new()
            .with_check_mode(self.check_mode)
            .with_diff_mode(self.diff_mode)
            .with_settings(ctx.config.azure.clone());

        match ctx.registry.execute(&self.module, &params, &context).await {
            Ok(output) => {
                debug!("{} finished with status {}", self.module, output.status);
                ctx.output.result(&self.module, &output)?;
                Ok(0)
            }
            Err(e) => self.report_error(ctx, Error::from_module(&self.module, e)),
        }
    }

    fn report_error(&self, ctx: &CommandContext, e: Error) -> Result<i32> {
        error!("{}", e);
        ctx.output.result(&self.module, &ModuleOutput::failed(e.to_string()))?;
        Ok(e.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    fn run_args(args: Option<PathBuf>, pairs: &[&str]) -> RunArgs {
        RunArgs {
            module: "azure_rm_virtualnetwork".to_string(),
            args,
            arg: pairs.iter().map(|p| p.to_string()).collect(),
            check_mode: false,
            diff_mode: false,
        }
    }

    #[test]
    fn test_pairs_are_parsed_as_yaml() {
        let params = run_args(None, &["name=vnet1", "address_prefixes=[10.0.0.0/16]", "append_tags=false"])
            .params()
            .unwrap();
        assert_eq!(params["name"], json!("vnet1"));
        assert_eq!(params["address_prefixes"], json!(["10.0.0.0/16"]));
        assert_eq!(params["append_tags"], json!("false"));
    }

    #[test]
    fn test_scalar_pairs_stay_strings() {
        let params = run_args(None, &["name=1.10", "collation=1.10", "tags={env: prod}"])
            .params()
            .unwrap();
        assert_eq!(params["name"], json!("1.10"));
        assert_eq!(params["collation"], json!("1.10"));
        assert_eq!(params["tags"], json!({"env": "prod"}));
    }

    #[tokio::test]
    async fn test_pair_values_are_typed_by_the_module() {
        use crate::azure::MockArmClient;
        use crate::modules::ModuleRegistry;
        use std::sync::Arc;

        let client = MockArmClient::new("sub");
        let params = RunArgs {
            module: "azure_rm_resourcegroup".to_string(),
            ..run_args(None, &["name=1.10", "location=eastus", "force_delete_nonempty=false"])
        }
        .params()
        .unwrap();
        let context = ModuleContext::new().with_client(Arc::new(client.clone()));
        let output = ModuleRegistry::with_builtins()
            .execute("azure_rm_resourcegroup", &params, &context)
            .await
            .unwrap();

        assert_eq!(output.msg, "Created resource group '1.10'");
        assert!(output.data["id"].as_str().unwrap().ends_with("/1.10"));
        assert!(client.mutating_calls()[0].path.ends_with("/1.10"));
    }

    #[test]
    fn test_file_then_pairs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: vnet1\nresource_group: rg\ntags:\n  env: prod").unwrap();
        let params = run_args(Some(file.path().to_path_buf()), &["name=vnet2"]).params().unwrap();
        assert_eq!(params["name"], json!("vnet2"));
        assert_eq!(params["tags"], json!({"env": "prod"}));
    }

    #[test]
    fn test_bad_pair_is_usage_error() {
        let err = run_args(None, &["novalue"]).params().unwrap_err();
        assert!(err.is_usage_error());
        assert_eq!(err.exit_code(), 2);
    }
}
