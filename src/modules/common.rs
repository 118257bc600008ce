//! Options and helpers shared by every Azure module.

use crate::azure::auth::AuthOptions;
use crate::azure::{render_path, ArmClient, HttpArmClient};
use crate::resources::ResourceDescriptor;
use crate::schema::{scalar_text, ArgSpec, OptionSpec, ValidatedArgs};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{ModuleContext, ModuleError, ModuleResult};

/// Authentication options accepted by every module.
pub fn auth_spec() -> ArgSpec {
    ArgSpec::new()
        .option(
            "subscription_id",
            OptionSpec::str().doc("Subscription to operate in. Falls back to AZURE_SUBSCRIPTION_ID."),
        )
        .option("client_id", OptionSpec::str().doc("Service principal application id."))
        .option("secret", OptionSpec::str().no_log().doc("Service principal secret."))
        .option("tenant", OptionSpec::str().doc("Microsoft Entra tenant id."))
        .option("profile", OptionSpec::str().doc("Profile in ~/.azure/credentials."))
        .option(
            "cloud_environment",
            OptionSpec::str().doc("AzureCloud, AzureChinaCloud or AzureUSGovernment."),
        )
        .option(
            "auth_source",
            OptionSpec::str()
                .choices(&["auto", "env", "credential_file", "cli", "msi"])
                .doc("Where credentials are read from."),
        )
}

/// Identity options derived from the resource path.
pub fn identity_spec(descriptor: &ResourceDescriptor, required: bool) -> ArgSpec {
    descriptor
        .identity()
        .into_iter()
        .fold(ArgSpec::new(), |spec, name| {
            let mut option = OptionSpec::str();
            if required {
                option = option.required();
            }
            option = match name.as_str() {
                "resource_group" => option
                    .aliases(&["resource_group_name"])
                    .doc("Name of the resource group."),
                "name" => option.doc(format!("Name of the {}.", descriptor.display)),
                other => option.doc(format!("Name of the parent {}.", other.trim_end_matches("_name"))),
            };
            spec.option(name, option)
        })
}

/// `state`, `tags` and `append_tags`.
pub fn management_spec() -> ArgSpec {
    ArgSpec::new()
        .option(
            "state",
            OptionSpec::str()
                .default(json!("present"))
                .choices(&["present", "absent"])
                .doc("Assert the state of the resource."),
        )
        .option("tags", OptionSpec::dict().doc("Resource tags."))
        .option(
            "append_tags",
            OptionSpec::bool()
                .default(json!(true))
                .doc("Keep existing tags that are not listed in tags."),
        )
}

/// Desired state of a managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

fn default_true() -> bool {
    true
}

/// Typed view of the options every management module shares.
#[derive(Debug, Clone, Deserialize)]
pub struct CommonArgs {
    #[serde(default)]
    pub state: DesiredState,
    #[serde(default)]
    pub tags: Option<Map<String, Value>>,
    #[serde(default = "default_true")]
    pub append_tags: bool,
}

impl CommonArgs {
    /// Tags with every value rendered as a string, as ARM stores them.
    pub fn tags(&self) -> Option<Map<String, Value>> {
        self.tags.as_ref().map(|tags| {
            tags.iter()
                .map(|(k, v)| (k.clone(), Value::String(scalar_text(v))))
                .collect()
        })
    }
}

/// Client from the context, or one connected with the module's credentials.
pub async fn arm_client(args: &ValidatedArgs, context: &ModuleContext) -> ModuleResult<Arc<dyn ArmClient>> {
    if let Some(client) = &context.client {
        return Ok(client.clone());
    }
    let options: AuthOptions = args.deserialize()?;
    let client = HttpArmClient::connect(&options, &context.settings).await?;
    Ok(Arc::new(client))
}

/// Render a path template from the arguments.
pub fn render(template: &str, args: &ValidatedArgs, subscription_id: &str) -> ModuleResult<String> {
    render_path(template, |key| match key {
        "subscription_id" => Some(subscription_id.to_string()),
        other => args.str(other).map(str::to_string),
    })
    .map_err(ModuleError::MissingParameter)
}
