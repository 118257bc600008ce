//! Structural comparison of a desired ARM body against the live resource.
//!
//! Only what the desired body specifies is compared. Scalars are compared
//! per path according to the option's [`Comparison`], lists are compared
//! order-insensitively, and paths marked not updatable turn differences
//! into warnings.

use super::body::{disposition_path, effective_disposition};
use super::{scalar_text, ArgSpec, ArgType, Comparison};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::trace;

/// Per-path compare settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareModifier {
    pub updatable: bool,
    pub comparison: Comparison,
    pub key: Option<String>,
}

impl Default for CompareModifier {
    fn default() -> Self {
        Self {
            updatable: true,
            comparison: Comparison::Default,
            key: None,
        }
    }
}

/// Compare modifiers keyed by body path (`/properties/addressSpace/addressPrefixes`).
#[derive(Debug, Clone, Default)]
pub struct CompareModifiers {
    modifiers: HashMap<String, CompareModifier>,
}

impl CompareModifiers {
    /// Derive modifiers from an argument spec using the same dispositions as the body.
    pub fn from_spec(spec: &ArgSpec) -> Self {
        let mut out = Self::default();
        out.collect(spec, "", false);
        out
    }

    fn collect(&mut self, spec: &ArgSpec, prefix: &str, nested: bool) {
        for (name, option) in &spec.options {
            let Some(disposition) = effective_disposition(option, nested) else {
                continue;
            };
            let path = format!("{}/{}", prefix, disposition_path(name, disposition).join("/"));

            let modifier = CompareModifier {
                updatable: option.updatable,
                comparison: option.comparison,
                key: option.key.clone(),
            };
            if modifier != CompareModifier::default() {
                self.modifiers.insert(path.clone(), modifier.clone());
                // Scalar lists compare their elements with the list's settings.
                if option.arg_type == ArgType::List && option.suboptions.is_none() {
                    self.modifiers.insert(format!("{}/*", path), modifier);
                }
            }

            if let Some(sub) = &option.suboptions {
                let child_prefix = if option.arg_type == ArgType::List {
                    format!("{}/*", path)
                } else {
                    path
                };
                self.collect(sub, &child_prefix, true);
            }
        }
    }

    pub fn insert(&mut self, path: impl Into<String>, modifier: CompareModifier) {
        self.modifiers.insert(path.into(), modifier);
    }

    pub fn get(&self, path: &str) -> CompareModifier {
        self.modifiers.get(path).cloned().unwrap_or_default()
    }
}

/// Outcome of [`default_compare`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompareReport {
    /// `changed [<path>] <new> != <old> - <comparison>` entries for updatable paths.
    pub differences: Vec<String>,
    /// Differences on paths that cannot be updated.
    pub warnings: Vec<String>,
    /// Desired body with server-side sub-objects carried over where the
    /// desired side left them out; this is the body to PUT on update.
    pub merged: Value,
}

impl CompareReport {
    pub fn is_match(&self) -> bool {
        self.differences.is_empty()
    }
}

struct Comparer<'a> {
    modifiers: &'a CompareModifiers,
    differences: Vec<String>,
    warnings: Vec<String>,
}

/// Compare `desired` against `existing`.
pub fn default_compare(modifiers: &CompareModifiers, desired: &Value, existing: &Value) -> CompareReport {
    let mut comparer = Comparer {
        modifiers,
        differences: Vec::new(),
        warnings: Vec::new(),
    };
    let (_, merged) = comparer.compare(desired, existing, "");
    CompareReport {
        differences: comparer.differences,
        warnings: comparer.warnings,
        merged,
    }
}

impl Comparer<'_> {
    /// Returns whether `new` matches `old`, and the merged value for `new`.
    fn compare(&mut self, new: &Value, old: &Value, path: &str) -> (bool, Value) {
        match new {
            Value::Null => (true, Value::Null),
            Value::Object(new_map) => self.compare_object(new_map, old, path),
            Value::Array(new_items) => self.compare_list(new_items, old, path),
            scalar => (self.compare_scalar(scalar, old, path), scalar.clone()),
        }
    }

    fn compare_object(&mut self, new: &Map<String, Value>, old: &Value, path: &str) -> (bool, Value) {
        let Value::Object(old) = old else {
            let matched = self.mismatch(path, "old dict is null");
            return (matched, Value::Object(new.clone()));
        };

        let mut matched = true;
        let mut merged = new.clone();

        for (key, old_item) in old {
            if new.get(key).is_some_and(|v| !v.is_null()) {
                continue;
            }
            if old_item.is_object() {
                trace!("carrying existing [{}/{}] into the update body", path, key);
                merged.insert(key.clone(), old_item.clone());
            }
        }

        for (key, new_item) in new {
            if new_item.is_null() {
                continue;
            }
            let child = format!("{}/{}", path, key);
            let (ok, value) = self.compare(new_item, old.get(key).unwrap_or(&Value::Null), &child);
            matched &= ok;
            merged.insert(key.clone(), value);
        }

        (matched, Value::Object(merged))
    }

    fn compare_list(&mut self, new: &[Value], old: &Value, path: &str) -> (bool, Value) {
        let old = match old {
            Value::Array(old) if old.len() == new.len() => old,
            _ => {
                let matched = self.mismatch(path, "length is different or old value is null");
                return (matched, Value::Array(new.to_vec()));
            }
        };

        let sort_key = match new.first() {
            Some(Value::Object(first)) => Some(
                self.modifiers
                    .get(path)
                    .key
                    .unwrap_or_else(|| if first.contains_key("name") { "name" } else { "id" }.to_string()),
            ),
            _ => None,
        };
        let order = |items: &[Value]| -> Vec<usize> {
            let mut idx: Vec<usize> = (0..items.len()).collect();
            idx.sort_by_key(|&i| sort_text(&items[i], sort_key.as_deref()));
            idx
        };
        let new_order = order(new);
        let old_order = order(old);

        let mut matched = true;
        let mut merged = new.to_vec();
        let element_path = format!("{}/*", path);
        for (&n, &o) in new_order.iter().zip(old_order.iter()) {
            let (ok, value) = self.compare(&new[n], &old[o], &element_path);
            matched &= ok;
            merged[n] = value;
        }
        (matched, Value::Array(merged))
    }

    /// Record a structural mismatch at `path`, honouring the path's modifier.
    fn mismatch(&mut self, path: &str, reason: &str) -> bool {
        let modifier = self.modifiers.get(path);
        if modifier.comparison == Comparison::Ignore {
            return true;
        }
        if modifier.updatable {
            self.differences.push(format!("changed [{}] {}", path, reason));
            false
        } else {
            self.warnings.push(format!("property '{}' cannot be updated ({})", path, reason));
            true
        }
    }

    fn compare_scalar(&mut self, new: &Value, old: &Value, path: &str) -> bool {
        let modifier = self.modifiers.get(path);

        let (new_text, old_text) = match (modifier.comparison, new, old) {
            (Comparison::Ignore, _, _) => return true,
            (Comparison::Default, Value::String(n), Value::String(o)) => (n.to_lowercase(), o.to_lowercase()),
            (Comparison::Location, Value::String(n), Value::String(o)) => (
                n.replace(' ', "").to_lowercase(),
                o.replace(' ', "").to_lowercase(),
            ),
            _ => (scalar_text(new), scalar_text(old)),
        };

        if new_text == old_text {
            return true;
        }

        if modifier.updatable {
            self.differences.push(format!(
                "changed [{}] {} != {} - {}",
                path,
                scalar_text(new),
                scalar_text(old),
                modifier.comparison
            ));
            false
        } else {
            self.warnings.push(format!(
                "property '{}' cannot be updated ({} -> {})",
                path,
                scalar_text(old),
                scalar_text(new)
            ));
            true
        }
    }
}

fn sort_text(value: &Value, key: Option<&str>) -> String {
    match (value, key) {
        (Value::Object(map), Some(key)) => map.get(key).map(scalar_text).unwrap_or_default().to_lowercase(),
        (Value::Object(_), None) | (Value::Array(_), _) => value.to_string(),
        (scalar, _) => scalar_text(scalar).to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OptionSpec;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn modifiers() -> CompareModifiers {
        CompareModifiers::from_spec(
            &ArgSpec::new()
                .option("location", OptionSpec::str().disposition("/").comparison(Comparison::Location).not_updatable())
                .option("collation", OptionSpec::str().disposition("/properties/*").not_updatable())
                .option("admin_password", OptionSpec::str().disposition("/properties/*").comparison(Comparison::Ignore))
                .option("sku_name", OptionSpec::str().disposition("/sku/name").comparison(Comparison::Sensitive))
                .option(
                    "subnets",
                    OptionSpec::list(ArgType::Dict).disposition("/properties/*").key("name").suboptions(
                        ArgSpec::new()
                            .option("name", OptionSpec::str())
                            .option("address_prefix", OptionSpec::str().disposition("/properties/*")),
                    ),
                ),
        )
    }

    #[test]
    fn test_modifier_paths() {
        let m = modifiers();
        assert_eq!(m.get("/location").comparison, Comparison::Location);
        assert!(!m.get("/properties/collation").updatable);
        assert_eq!(m.get("/properties/subnets").key.as_deref(), Some("name"));
        assert_eq!(m.get("/properties/unknown"), CompareModifier::default());
    }

    #[test]
    fn test_identical_bodies_match() {
        let body = json!({"location": "eastus", "properties": {"enabled": true, "count": 3}});
        let report = default_compare(&modifiers(), &body, &body);
        assert!(report.is_match());
        assert_eq!(report.merged, body);
    }

    #[test]
    fn test_location_comparison() {
        let report = default_compare(&modifiers(), &json!({"location": "East US"}), &json!({"location": "eastus"}));
        assert!(report.is_match());
        assert!(report.differences.is_empty());
    }

    #[test]
    fn test_default_is_case_insensitive_and_sensitive_is_not() {
        let m = modifiers();
        assert!(default_compare(&m, &json!({"properties": {"tier": "BASIC"}}), &json!({"properties": {"tier": "Basic"}})).is_match());

        let report = default_compare(&m, &json!({"sku": {"name": "basic"}}), &json!({"sku": {"name": "Basic"}}));
        assert_eq!(report.differences, vec!["changed [/sku/name] basic != Basic - sensitive"]);
    }

    #[test]
    fn test_not_updatable_produces_warning() {
        let report = default_compare(
            &modifiers(),
            &json!({"properties": {"collation": "Latin1"}}),
            &json!({"properties": {"collation": "SQL_Latin1"}}),
        );
        assert!(report.is_match());
        assert_eq!(
            report.warnings,
            vec!["property '/properties/collation' cannot be updated (SQL_Latin1 -> Latin1)"]
        );
    }

    #[test]
    fn test_ignore_and_absent_desired_keys() {
        let report = default_compare(
            &modifiers(),
            &json!({"properties": {"adminPassword": "new", "tier": null}}),
            &json!({"properties": {"adminPassword": null, "tier": "Basic", "state": "Ready"}}),
        );
        assert!(report.is_match());
    }

    #[test]
    fn test_old_dict_carried_into_merged_body() {
        let report = default_compare(
            &modifiers(),
            &json!({"location": "eastus"}),
            &json!({"location": "eastus", "properties": {"encryption": {"status": "enabled"}}, "name": "x"}),
        );
        assert!(report.is_match());
        assert_eq!(
            report.merged,
            json!({"location": "eastus", "properties": {"encryption": {"status": "enabled"}}})
        );
    }

    #[test]
    fn test_lists_compared_unordered() {
        let m = modifiers();
        let new = json!({"properties": {"subnets": [
            {"name": "b", "properties": {"addressPrefix": "10.0.1.0/24"}},
            {"name": "a", "properties": {"addressPrefix": "10.0.0.0/24"}}
        ]}});
        let old = json!({"properties": {"subnets": [
            {"name": "a", "id": "/x/a", "properties": {"addressPrefix": "10.0.0.0/24"}},
            {"name": "b", "id": "/x/b", "properties": {"addressPrefix": "10.0.1.0/24"}}
        ]}});
        assert!(default_compare(&m, &new, &old).is_match());

        let scalars = default_compare(&m, &json!({"p": ["b", "A"]}), &json!({"p": ["a", "B"]}));
        assert!(scalars.is_match());
    }

    #[test]
    fn test_list_length_difference() {
        let report = default_compare(&modifiers(), &json!({"p": [1, 2]}), &json!({"p": [1]}));
        assert_eq!(report.differences, vec!["changed [/p] length is different or old value is null"]);
    }

    #[test]
    fn test_structural_mismatch_honours_modifiers() {
        let mut m = CompareModifiers::default();
        let fixed = CompareModifier { updatable: false, ..CompareModifier::default() };
        let ignored = CompareModifier { comparison: Comparison::Ignore, ..CompareModifier::default() };
        m.insert("/properties/addressPrefixes", fixed.clone());
        m.insert("/properties/encryption", fixed);
        m.insert("/properties/dnsServers", ignored.clone());
        m.insert("/properties/networkAcls", ignored);

        let report = default_compare(
            &m,
            &json!({"properties": {
                "addressPrefixes": ["10.0.0.0/16", "10.1.0.0/16"],
                "encryption": {"status": "enabled"},
                "dnsServers": ["10.0.0.4"],
                "networkAcls": {"defaultAction": "Deny"}
            }}),
            &json!({"properties": {"addressPrefixes": ["10.0.0.0/16"], "dnsServers": []}}),
        );
        assert!(report.is_match());
        assert_eq!(
            report.warnings,
            vec![
                "property '/properties/addressPrefixes' cannot be updated (length is different or old value is null)",
                "property '/properties/encryption' cannot be updated (old dict is null)",
            ]
        );
    }

    #[test]
    fn test_scalar_difference_message() {
        let report = default_compare(&modifiers(), &json!({"properties": {"count": 4}}), &json!({"properties": {"count": 3}}));
        assert!(!report.is_match());
        assert_eq!(report.differences, vec!["changed [/properties/count] 4 != 3 - default"]);
    }
}
