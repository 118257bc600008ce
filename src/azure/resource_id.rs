//! Parsing and formatting of ARM resource ids.
//!
//! An ARM id has the shape
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{type}/{name}...]`.
//! Subscription- and resource-group-level ids stop early.

use super::error::{ArmError, ArmResult};
use std::fmt;

/// Structured view of an ARM resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription: String,
    pub resource_group: Option<String>,
    pub namespace: Option<String>,
    /// `(type, name)` pairs below the provider namespace, outermost first.
    pub types: Vec<(String, String)>,
}

impl ResourceId {
    /// Parse an id. Segment keywords are matched case-insensitively.
    pub fn parse(id: &str) -> ArmResult<Self> {
        let invalid = || ArmError::InvalidResourceId(id.to_string());
        let segments: Vec<&str> = id.trim_matches('/').split('/').collect();
        if segments.len() < 2 || !segments[0].eq_ignore_ascii_case("subscriptions") {
            return Err(invalid());
        }

        let subscription = segments[1].to_string();
        let mut rest = &segments[2..];
        let mut resource_group = None;
        let mut namespace = None;
        let mut types = Vec::new();

        if rest.len() >= 2 && rest[0].eq_ignore_ascii_case("resourcegroups") {
            resource_group = Some(rest[1].to_string());
            rest = &rest[2..];
        }

        if !rest.is_empty() {
            if !rest[0].eq_ignore_ascii_case("providers") || rest.len() < 2 {
                return Err(invalid());
            }
            namespace = Some(rest[1].to_string());
            let pairs = &rest[2..];
            // A trailing type without a name is a collection, not a resource.
            if pairs.len() % 2 != 0 {
                return Err(invalid());
            }
            for pair in pairs.chunks(2) {
                types.push((pair[0].to_string(), pair[1].to_string()));
            }
        }

        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }

        Ok(Self {
            subscription,
            resource_group,
            namespace,
            types,
        })
    }

    /// Full resource type, e.g. `Microsoft.Sql/servers/databases`.
    pub fn resource_type(&self) -> String {
        match &self.namespace {
            Some(ns) => {
                let mut out = ns.clone();
                for (t, _) in &self.types {
                    out.push('/');
                    out.push_str(t);
                }
                out
            }
            None if self.resource_group.is_some() => "Microsoft.Resources/resourceGroups".to_string(),
            None => "Microsoft.Resources/subscriptions".to_string(),
        }
    }

    /// Leaf name of the resource.
    pub fn name(&self) -> &str {
        if let Some((_, name)) = self.types.last() {
            name
        } else if let Some(rg) = &self.resource_group {
            rg
        } else {
            &self.subscription
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{}", rg)?;
        }
        if let Some(ns) = &self.namespace {
            write!(f, "/providers/{}", ns)?;
            for (t, n) in &self.types {
                write!(f, "/{}/{}", t, n)?;
            }
        }
        Ok(())
    }
}

/// Whether `value` already looks like a full resource id.
pub fn is_resource_id(value: &str) -> bool {
    const PREFIX: &str = "/subscriptions/";
    value.len() > PREFIX.len()
        && value
            .get(..PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX))
}
