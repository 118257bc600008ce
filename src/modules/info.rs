//! Read dispatcher behind the `*_info` modules.
//!
//! A resource declares its read routes most specific first ("get one",
//! "list by server", "list by resource group", "list all"). The first route
//! whose path placeholders are all provided fires; exactly one route runs per
//! call.

use super::common::{arm_client, auth_spec, identity_spec, render};
use super::{Module, ModuleContext, ModuleError, ModuleOutput, ModuleResult};
use crate::azure::{placeholders, ArmClient};
use crate::resources::ResourceDescriptor;
use crate::schema::{snake_keys, ArgSpec, ArgType, OptionSpec, ValidatedArgs};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

/// Whether a route fetches one resource or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Get,
    List,
}

/// One read operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRoute {
    pub operation: &'static str,
    pub kind: RouteKind,
    pub path: &'static str,
}

impl ReadRoute {
    pub const fn get(operation: &'static str, path: &'static str) -> Self {
        Self {
            operation,
            kind: RouteKind::Get,
            path,
        }
    }

    pub const fn list(operation: &'static str, path: &'static str) -> Self {
        Self {
            operation,
            kind: RouteKind::List,
            path,
        }
    }

    /// Options that must be set for this route to fire.
    pub fn requires(&self) -> Vec<String> {
        placeholders(self.path)
            .into_iter()
            .filter(|p| p != "subscription_id")
            .collect()
    }

    fn is_satisfied(&self, args: &ValidatedArgs) -> bool {
        self.requires().iter().all(|name| args.has(name))
    }
}

/// Pick the first route whose required options are all present.
pub fn select_route<'a>(routes: &'a [ReadRoute], args: &ValidatedArgs) -> ModuleResult<&'a ReadRoute> {
    if let Some(route) = routes.iter().find(|r| r.is_satisfied(args)) {
        return Ok(route);
    }

    let alternatives: Vec<String> = routes
        .iter()
        .map(|r| format!("{} ({})", r.operation, r.requires().join(", ")))
        .collect();
    Err(ModuleError::MissingParameter(format!(
        "no read operation matches the given parameters; one of these is needed: {}",
        alternatives.join("; ")
    )))
}

/// Result of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// One item for a get, every item in service order for a list.
    Found(Vec<Value>),
    /// The get target does not exist, or the collection is empty.
    Empty,
}

impl ReadOutcome {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            ReadOutcome::Found(items) => items,
            ReadOutcome::Empty => Vec::new(),
        }
    }
}

/// Run one route. A 404 on a get is [`ReadOutcome::Empty`]; every other failure is an error.
pub async fn dispatch(
    client: &dyn ArmClient,
    api_version: &str,
    route: &ReadRoute,
    args: &ValidatedArgs,
) -> ModuleResult<ReadOutcome> {
    let path = render(route.path, args, client.subscription_id())?;
    debug!("Read route {} -> {}", route.operation, path);

    let outcome = match route.kind {
        RouteKind::Get => match client.get(&path, api_version).await? {
            Some(item) => ReadOutcome::Found(vec![item]),
            None => ReadOutcome::Empty,
        },
        RouteKind::List => {
            let items = client.list(&path, api_version).await?;
            if items.is_empty() {
                ReadOutcome::Empty
            } else {
                ReadOutcome::Found(items)
            }
        }
    };
    Ok(outcome)
}

/// Whether `resource` carries every `key` / `key:value` tag filter.
pub fn has_tags(resource: &Value, filters: &[String]) -> bool {
    let tags = resource.get("tags").and_then(Value::as_object);
    filters.iter().all(|filter| {
        let (key, expected) = match filter.split_once(':') {
            Some((key, value)) => (key, Some(value)),
            None => (filter.as_str(), None),
        };
        match (tags.and_then(|t| t.get(key)), expected) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual.as_str() == Some(expected),
            (None, _) => false,
        }
    })
}

/// `_info` module for one resource.
pub struct InfoModule {
    descriptor: &'static ResourceDescriptor,
}

impl InfoModule {
    pub fn new(descriptor: &'static ResourceDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait]
impl Module for InfoModule {
    fn name(&self) -> &'static str {
        self.descriptor.info_module
    }

    fn description(&self) -> &'static str {
        self.descriptor.description
    }

    fn argument_spec(&self) -> ArgSpec {
        identity_spec(self.descriptor, false)
            .option(
                "tags",
                OptionSpec::list(ArgType::Str).doc("Only return resources carrying these tags (key or key:value)."),
            )
            .merge(auth_spec())
    }

    async fn execute(&self, args: &ValidatedArgs, context: &ModuleContext) -> ModuleResult<ModuleOutput> {
        let d = self.descriptor;
        let route = select_route(d.routes, args)?;
        let client = arm_client(args, context).await?;

        let outcome = dispatch(client.as_ref(), d.api_version, route, args)
            .await
            .map_err(|e| match e {
                ModuleError::Azure(err) => {
                    ModuleError::ExecutionFailed(format!("Failed to {} {}: {}", route.operation, d.display, err))
                }
                other => other,
            })?;

        let filters: Vec<String> = args
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        let items: Vec<Value> = outcome
            .into_items()
            .into_iter()
            .filter(|item| has_tags(item, &filters))
            .map(|item| snake_keys(&item))
            .collect();

        info!("{} returned {} {}(s)", route.operation, items.len(), d.display);
        Ok(ModuleOutput::ok(format!("Found {} {}(s)", items.len(), d.display))
            .with_data(d.info_key, Value::Array(items)))
    }
}
