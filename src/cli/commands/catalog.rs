//! `list` and `doc` subcommands

use super::CommandContext;
use crate::error::{Error, Result};
use clap::Parser;
use serde_json::json;

/// Arguments for the doc command
#[derive(Parser, Debug, Clone)]
pub struct DocArgs {
    /// Module name, e.g. azure_rm_virtualnetwork
    pub module: String,
}

/// Print every registered module with its description
pub fn list(ctx: &CommandContext) -> Result<i32> {
    let names = ctx.registry.names();
    if ctx.output.is_json() {
        let modules: serde_json::Map<String, serde_json::Value> = names
            .iter()
            .filter_map(|name| ctx.registry.get(name))
            .map(|module| (module.name().to_string(), json!(module.description())))
            .collect();
        ctx.output.document(&modules)?;
    } else {
        let rows: Vec<(String, String)> = names
            .iter()
            .filter_map(|name| ctx.registry.get(name))
            .map(|module| (module.name().to_string(), module.description().to_string()))
            .collect();
        ctx.output.table(&rows);
    }
    Ok(0)
}

impl DocArgs {
    pub fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let module = ctx
            .registry
            .get(&self.module)
            .ok_or_else(|| Error::ModuleNotFound(self.module.clone()))?;

        let mut doc = serde_json::Map::new();
        doc.insert("module".to_string(), json!(module.name()));
        doc.insert("description".to_string(), json!(module.description()));
        doc.insert("options".to_string(), serde_json::to_value(module.argument_spec())?);
        print!("{}", serde_yaml::to_string(&doc)?);
        Ok(0)
    }
}
