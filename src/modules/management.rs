//! Create/Update/Delete state machine behind the management modules.
//!
//! A [`ResourceRequest`] is built once from the validated arguments, [`plan`]
//! decides the action from the request and the live resource, and
//! [`reconcile`] carries the plan out against an [`ArmClient`].

use super::common::{arm_client, auth_spec, identity_spec, management_spec, render, CommonArgs, DesiredState};
use super::{Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleResult};
use crate::azure::ArmClient;
use crate::resources::resource_group::RESOURCE_GROUP;
use crate::resources::{LocationPolicy, ResourceDescriptor, RESOURCE_GROUP_PATH};
use crate::schema::{default_compare, inflate, snake_keys, ArgSpec, CompareModifiers, ValidatedArgs};
use async_trait::async_trait;
use serde_json::{Map, Value};
use similar::{ChangeTag, TextDiff};
use std::fmt;
use tracing::{debug, info, warn};

/// What the module does to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NoAction,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_change(&self) -> bool {
        !matches!(self, Action::NoAction)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::NoAction => write!(f, "none"),
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// Everything a management module wants, resolved from its arguments.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub descriptor: &'static ResourceDescriptor,
    pub name: String,
    pub path: String,
    pub state: DesiredState,
    /// Desired ARM body without tags.
    pub body: Value,
    pub tags: Option<Map<String, Value>>,
    pub append_tags: bool,
    pub force_delete_nonempty: bool,
    /// Enclosing resource group, used when the location is inherited.
    pub resource_group_path: Option<String>,
}

impl ResourceRequest {
    pub fn build(
        descriptor: &'static ResourceDescriptor,
        args: &ValidatedArgs,
        subscription_id: &str,
    ) -> ModuleResult<Self> {
        let common: CommonArgs = args.deserialize()?;
        let path = render(descriptor.path, args, subscription_id)?;

        let mut body = inflate(&(descriptor.options)(), args, subscription_id)?;
        if let (LocationPolicy::Fixed(location), Value::Object(map)) = (descriptor.location, &mut body) {
            map.insert("location".to_string(), Value::String(location.to_string()));
        }

        let resource_group_path = match descriptor.location {
            LocationPolicy::InheritFromResourceGroup => Some(render(RESOURCE_GROUP_PATH, args, subscription_id)?),
            _ => None,
        };

        Ok(Self {
            descriptor,
            name: args.str("name").unwrap_or_default().to_string(),
            path,
            state: common.state,
            body,
            tags: common.tags(),
            append_tags: common.append_tags,
            force_delete_nonempty: args.bool_or("force_delete_nonempty", false),
            resource_group_path,
        })
    }

    fn location(&self) -> Option<&str> {
        self.body.get("location").and_then(Value::as_str)
    }

    fn with_location(&self, location: &str) -> Self {
        let mut request = self.clone();
        if let Value::Object(map) = &mut request.body {
            map.insert("location".to_string(), Value::String(location.to_string()));
        }
        request
    }
}

/// Decision taken by [`plan`].
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub action: Action,
    /// Body to PUT for create and update.
    pub body: Option<Value>,
    pub differences: Vec<String>,
    pub warnings: Vec<String>,
}

/// Merge desired tags into the existing ones.
///
/// Returns whether the tag set changes and the resulting tags.
pub fn update_tags(
    existing: Option<&Map<String, Value>>,
    desired: Option<&Map<String, Value>>,
    append: bool,
) -> (bool, Map<String, Value>) {
    let current = existing.cloned().unwrap_or_default();
    let Some(desired) = desired else {
        return (false, current);
    };

    let mut merged = if append { current.clone() } else { Map::new() };
    for (key, value) in desired {
        merged.insert(key.clone(), value.clone());
    }
    (merged != current, merged)
}

/// Decide what to do with `existing` given the request. Makes no calls.
pub fn plan(request: &ResourceRequest, existing: Option<&Value>) -> Plan {
    let mut plan = Plan {
        action: Action::NoAction,
        body: None,
        differences: Vec::new(),
        warnings: Vec::new(),
    };

    match (request.state, existing) {
        (DesiredState::Absent, None) => {}
        (DesiredState::Absent, Some(_)) => plan.action = Action::Delete,
        (DesiredState::Present, None) => {
            let mut body = request.body.clone();
            if let (Some(tags), Value::Object(map)) = (&request.tags, &mut body) {
                map.insert("tags".to_string(), Value::Object(tags.clone()));
            }
            plan.action = Action::Create;
            plan.body = Some(body);
        }
        (DesiredState::Present, Some(existing)) => {
            let modifiers = CompareModifiers::from_spec(&(request.descriptor.options)());
            let report = default_compare(&modifiers, &request.body, existing);
            plan.differences = report.differences;
            plan.warnings = report.warnings;

            let existing_tags = existing.get("tags").and_then(Value::as_object);
            let (tags_changed, tags) = update_tags(existing_tags, request.tags.as_ref(), request.append_tags);
            if tags_changed {
                plan.differences.push(format!(
                    "changed [/tags] {} != {}",
                    Value::Object(tags.clone()),
                    existing_tags.cloned().map(Value::Object).unwrap_or(Value::Null)
                ));
            }

            let mut body = report.merged;
            if let Value::Object(map) = &mut body {
                if existing_tags.is_some() || request.tags.is_some() {
                    map.insert("tags".to_string(), Value::Object(tags));
                }
            }

            if !plan.differences.is_empty() {
                plan.action = Action::Update;
                plan.body = Some(body);
            }
        }
    }
    plan
}

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub action: Action,
    pub changed: bool,
    /// Resource after the run; what it would be in check mode. `None` once deleted.
    pub resource: Option<Value>,
    pub differences: Vec<String>,
    pub warnings: Vec<String>,
    pub diff: Option<Diff>,
}

/// Fill in the location when the body does not carry one.
async fn resolve_location(
    client: &dyn ArmClient,
    request: &ResourceRequest,
    existing: Option<&Value>,
) -> ModuleResult<ResourceRequest> {
    if request.state == DesiredState::Absent || request.location().is_some() {
        return Ok(request.clone());
    }
    if let Some(location) = existing.and_then(|e| e.get("location")).and_then(Value::as_str) {
        return Ok(request.with_location(location));
    }

    match (&request.descriptor.location, &request.resource_group_path) {
        (LocationPolicy::InheritFromResourceGroup, Some(group_path)) => {
            let group = client
                .get(group_path, RESOURCE_GROUP.api_version)
                .await?
                .ok_or_else(|| ModuleError::ExecutionFailed(format!("Resource group {} does not exist", group_path)))?;
            let location = group
                .get("location")
                .and_then(Value::as_str)
                .ok_or_else(|| ModuleError::ExecutionFailed(format!("Resource group {} has no location", group_path)))?;
            debug!("Using location {} of {}", location, group_path);
            Ok(request.with_location(location))
        }
        _ => Err(ModuleError::MissingParameter(format!(
            "location is required to create {} '{}'",
            request.descriptor.display, request.name
        ))),
    }
}

/// Refuse to delete a container that still holds resources.
async fn check_delete_guard(client: &dyn ArmClient, request: &ResourceRequest) -> ModuleResult<()> {
    if !request.descriptor.guard_nonempty || request.force_delete_nonempty {
        return Ok(());
    }
    let contents = client
        .list(&format!("{}/resources", request.path), request.descriptor.api_version)
        .await?;
    if contents.is_empty() {
        return Ok(());
    }
    Err(ModuleError::ExecutionFailed(format!(
        "{} '{}' still contains {} resource(s); set force_delete_nonempty to delete it anyway",
        request.descriptor.display,
        request.name,
        contents.len()
    )))
}

fn pretty(value: Option<&Value>) -> String {
    value
        .map(|v| serde_json::to_string_pretty(v).unwrap_or_default() + "\n")
        .unwrap_or_default()
}

/// Before/after rendering of a change with unified-style details.
pub fn render_diff(before: Option<&Value>, after: Option<&Value>) -> Diff {
    let before = pretty(before);
    let after = pretty(after);

    let mut details = String::new();
    for change in TextDiff::from_lines(&before, &after).iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        details.push_str(&format!("{}{}", sign, change));
    }

    Diff::new(before, after).with_details(details)
}

/// Bring the resource to the requested state.
pub async fn reconcile(
    client: &dyn ArmClient,
    request: &ResourceRequest,
    check_mode: bool,
    diff_mode: bool,
) -> ModuleResult<Reconciliation> {
    let d = request.descriptor;
    let existing = client.get(&request.path, d.api_version).await?;
    let request = resolve_location(client, request, existing.as_ref()).await?;

    let plan = plan(&request, existing.as_ref());
    debug!("Planned {} for {} ({} difference(s))", plan.action, request.path, plan.differences.len());
    for difference in &plan.differences {
        debug!("{}", difference);
    }
    for warning in &plan.warnings {
        warn!("{}", warning);
    }

    if plan.action == Action::Delete {
        check_delete_guard(client, &request).await?;
    }

    let resource = if check_mode || plan.action == Action::NoAction {
        match plan.action {
            Action::Delete => None,
            Action::NoAction => existing.clone(),
            Action::Create | Action::Update => plan
                .body
                .as_ref()
                .map(|body| predicted(&request, existing.as_ref(), body)),
        }
    } else {
        match (plan.action, &plan.body) {
            (Action::Create | Action::Update, Some(body)) => {
                let verb = if plan.action == Action::Create { "creating" } else { "updating" };
                let created = client.put(&request.path, d.api_version, body).await.map_err(|e| {
                    ModuleError::ExecutionFailed(format!("Error {} {} '{}': {}", verb, d.display, request.name, e))
                })?;
                info!("{} {} {}", plan.action, d.display, request.path);
                Some(created)
            }
            (Action::Delete, _) => {
                client.delete(&request.path, d.api_version).await.map_err(|e| {
                    ModuleError::ExecutionFailed(format!("Error deleting {} '{}': {}", d.display, request.name, e))
                })?;
                info!("Deleted {} {}", d.display, request.path);
                None
            }
            _ => existing.clone(),
        }
    };

    let diff = diff_mode.then(|| render_diff(existing.as_ref(), resource.as_ref()));

    Ok(Reconciliation {
        action: plan.action,
        changed: plan.action.is_change(),
        resource,
        differences: plan.differences,
        warnings: plan.warnings,
        diff,
    })
}

/// The resource a check-mode run would leave behind: the planned body
/// with the identity fields ARM would return.
fn predicted(request: &ResourceRequest, existing: Option<&Value>, body: &Value) -> Value {
    let mut body = body.clone();
    if let Value::Object(map) = &mut body {
        let identity = [
            ("id", Value::String(request.path.clone())),
            ("name", Value::String(request.name.clone())),
            ("type", Value::String(request.descriptor.resource_type.to_string())),
        ];
        for (key, fallback) in identity {
            let value = existing.and_then(|e| e.get(key)).cloned().unwrap_or(fallback);
            map.entry(key).or_insert(value);
        }
    }
    body
}

fn message(request: &ResourceRequest, action: Action, check_mode: bool) -> String {
    let d = request.descriptor;
    let verb = match (action, check_mode) {
        (Action::Create, false) => "Created",
        (Action::Update, false) => "Updated",
        (Action::Delete, false) => "Deleted",
        (Action::Create, true) => "Would create",
        (Action::Update, true) => "Would update",
        (Action::Delete, true) => "Would delete",
        (Action::NoAction, _) => {
            return match request.state {
                DesiredState::Present => format!("{} '{}' is up to date", d.display, request.name),
                DesiredState::Absent => format!("{} '{}' does not exist", d.display, request.name),
            };
        }
    };
    format!("{} {} '{}'", verb, d.display, request.name)
}

/// Management module for one resource.
pub struct ManagementModule {
    descriptor: &'static ResourceDescriptor,
}

impl ManagementModule {
    pub fn new(descriptor: &'static ResourceDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait]
impl Module for ManagementModule {
    fn name(&self) -> &'static str {
        self.descriptor.module
    }

    fn description(&self) -> &'static str {
        self.descriptor.description
    }

    fn argument_spec(&self) -> ArgSpec {
        identity_spec(self.descriptor, true)
            .merge(management_spec())
            .merge((self.descriptor.options)())
            .merge(auth_spec())
    }

    async fn execute(&self, args: &ValidatedArgs, context: &ModuleContext) -> ModuleResult<ModuleOutput> {
        let client = arm_client(args, context).await?;
        let request = ResourceRequest::build(self.descriptor, args, client.subscription_id())?;
        let outcome = reconcile(client.as_ref(), &request, context.check_mode, context.diff_mode).await?;

        let msg = message(&request, outcome.action, context.check_mode);
        let mut output = if outcome.changed {
            ModuleOutput::changed(msg)
        } else {
            ModuleOutput::ok(msg)
        };

        let state = outcome.resource.as_ref().map(snake_keys).unwrap_or_else(|| Value::Object(Map::new()));
        if let Some(id) = outcome.resource.as_ref().and_then(|r| r.get("id")).cloned() {
            output = output.with_data("id", id);
        }
        output = output.with_data("state", state);
        if !outcome.differences.is_empty() {
            let compare = outcome.differences.into_iter().map(Value::String).collect();
            output = output.with_data("compare", Value::Array(compare));
        }
        if let Some(diff) = outcome.diff {
            output = output.with_diff(diff);
        }
        Ok(output.with_warnings(outcome.warnings))
    }
}
