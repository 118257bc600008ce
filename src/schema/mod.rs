//! Declarative argument specifications.
//!
//! Every module describes its options with an [`ArgSpec`]: types, defaults,
//! choices, aliases, nested suboptions, plus the ARM-specific metadata the
//! body builder and the structural diff need (dispositions and compare
//! modifiers). Raw parameters are checked against the spec once, producing
//! [`ValidatedArgs`] that the rest of the module works with.

pub mod body;
pub mod compare;

pub use body::{camelize, inflate, snake_case, snake_keys};
pub use compare::{default_compare, CompareModifier, CompareModifiers, CompareReport};

use crate::modules::{ModuleError, ModuleParams, ModuleResult};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Placeholder written in place of `no_log` values.
pub const REDACTED: &str = "********";

/// Type of an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    Str,
    Bool,
    Int,
    Dict,
    List,
    Raw,
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::Str => "str",
            ArgType::Bool => "bool",
            ArgType::Int => "int",
            ArgType::Dict => "dict",
            ArgType::List => "list",
            ArgType::Raw => "raw",
        };
        write!(f, "{}", name)
    }
}

/// How a scalar is compared against the live resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Case-insensitive for strings.
    #[default]
    Default,
    /// Exact.
    Sensitive,
    /// Case-insensitive with spaces removed.
    Location,
    /// Never reported as a difference.
    Ignore,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Comparison::Default => "default",
            Comparison::Sensitive => "sensitive",
            Comparison::Location => "location",
            Comparison::Ignore => "ignore",
        };
        write!(f, "{}", name)
    }
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_default_comparison(c: &Comparison) -> bool {
    *c == Comparison::Default
}

/// Specification of one option.
#[derive(Debug, Clone, Serialize)]
pub struct OptionSpec {
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub no_log: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<ArgType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suboptions: Option<ArgSpec>,
    /// Body path the value is written to; options without one stay out of the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(skip_serializing_if = "is_true")]
    pub updatable: bool,
    #[serde(skip_serializing_if = "is_default_comparison")]
    pub comparison: Comparison,
    /// Sort key for lists of dicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Id template used to expand a bare name into a full resource id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_reference: Option<String>,
}

impl OptionSpec {
    pub fn new(arg_type: ArgType) -> Self {
        Self {
            arg_type,
            description: String::new(),
            required: false,
            default: None,
            choices: Vec::new(),
            aliases: Vec::new(),
            no_log: false,
            elements: None,
            suboptions: None,
            disposition: None,
            updatable: true,
            comparison: Comparison::Default,
            key: None,
            resource_reference: None,
        }
    }

    pub fn str() -> Self {
        Self::new(ArgType::Str)
    }

    pub fn bool() -> Self {
        Self::new(ArgType::Bool)
    }

    pub fn int() -> Self {
        Self::new(ArgType::Int)
    }

    pub fn dict() -> Self {
        Self::new(ArgType::Dict)
    }

    pub fn list(elements: ArgType) -> Self {
        let mut spec = Self::new(ArgType::List);
        spec.elements = Some(elements);
        spec
    }

    pub fn raw() -> Self {
        Self::new(ArgType::Raw)
    }

    pub fn doc(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| Value::String((*c).to_string())).collect();
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| (*a).to_string()).collect();
        self
    }

    pub fn no_log(mut self) -> Self {
        self.no_log = true;
        self
    }

    pub fn suboptions(mut self, spec: ArgSpec) -> Self {
        self.suboptions = Some(spec);
        self
    }

    pub fn disposition(mut self, path: impl Into<String>) -> Self {
        self.disposition = Some(path.into());
        self
    }

    pub fn not_updatable(mut self) -> Self {
        self.updatable = false;
        self
    }

    pub fn comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn reference(mut self, template: impl Into<String>) -> Self {
        self.resource_reference = Some(template.into());
        self
    }
}

/// `required_if` rule: when `key == value`, every option in `requires` must be set.
#[derive(Debug, Clone, Serialize)]
pub struct RequiredIf {
    pub key: String,
    pub value: Value,
    pub requires: Vec<String>,
}

/// Ordered set of options plus cross-option rules.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArgSpec {
    pub options: IndexMap<String, OptionSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_if: Vec<RequiredIf>,
}

impl ArgSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option(mut self, name: impl Into<String>, spec: OptionSpec) -> Self {
        self.options.insert(name.into(), spec);
        self
    }

    /// Append every option of `other`, keeping options already present.
    pub fn merge(mut self, other: ArgSpec) -> Self {
        for (name, spec) in other.options {
            self.options.entry(name).or_insert(spec);
        }
        self.required_if.extend(other.required_if);
        self
    }

    pub fn required_if(mut self, key: &str, value: Value, requires: &[&str]) -> Self {
        self.required_if.push(RequiredIf {
            key: key.to_string(),
            value,
            requires: requires.iter().map(|r| (*r).to_string()).collect(),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.options.get(name)
    }

    /// Canonical option name for `name` or one of its aliases.
    fn canonical(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.options.get_key_value(name) {
            return Some(key.as_str());
        }
        self.options
            .iter()
            .find(|(_, spec)| spec.aliases.iter().any(|a| a == name))
            .map(|(key, _)| key.as_str())
    }

    /// Validate raw module parameters.
    pub fn validate(&self, params: &ModuleParams) -> ModuleResult<ValidatedArgs> {
        let input: Map<String, Value> = params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let values = self.validate_object(&input, "")?;
        let mut secrets = Vec::new();
        self.secret_paths(&[], &mut secrets);
        Ok(ValidatedArgs { values, secrets })
    }

    /// Paths of every `no_log` option, suboptions included; `*` stands for list elements.
    fn secret_paths(&self, prefix: &[String], out: &mut Vec<Vec<String>>) {
        for (name, spec) in &self.options {
            let mut path = prefix.to_vec();
            path.push(name.clone());
            if spec.no_log {
                out.push(path);
                continue;
            }
            if let Some(sub) = &spec.suboptions {
                if spec.arg_type == ArgType::List {
                    path.push("*".to_string());
                }
                sub.secret_paths(&path, out);
            }
        }
    }

    fn validate_object(&self, input: &Map<String, Value>, prefix: &str) -> ModuleResult<Map<String, Value>> {
        let mut provided: Map<String, Value> = Map::new();
        let mut unknown = BTreeSet::new();

        for (name, value) in input {
            match self.canonical(name) {
                Some(canonical) => {
                    provided.insert(canonical.to_string(), value.clone());
                }
                None => {
                    unknown.insert(format!("{}{}", prefix, name));
                }
            }
        }

        if !unknown.is_empty() {
            let supported: Vec<&str> = self.options.keys().map(String::as_str).collect();
            return Err(ModuleError::InvalidParameter(format!(
                "Unsupported parameters: {} (supported: {})",
                unknown.into_iter().collect::<Vec<_>>().join(", "),
                supported.join(", ")
            )));
        }

        let mut out = Map::new();
        for (name, spec) in &self.options {
            let path = format!("{}{}", prefix, name);
            let value = match provided.remove(name) {
                Some(Value::Null) | None => spec.default.clone(),
                Some(value) => Some(value),
            };

            match value {
                Some(value) => {
                    let value = spec.coerce(&value, &path)?;
                    spec.check_choices(&value, &path)?;
                    out.insert(name.clone(), value);
                }
                None if spec.required => {
                    return Err(ModuleError::MissingParameter(path));
                }
                None => {}
            }
        }

        for rule in &self.required_if {
            let matches = out
                .get(&rule.key)
                .is_some_and(|v| values_equal(v, &rule.value));
            if !matches {
                continue;
            }
            let missing: Vec<&str> = rule
                .requires
                .iter()
                .filter(|r| !out.contains_key(r.as_str()))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(ModuleError::MissingParameter(format!(
                    "{}{} is {} but the following are missing: {}",
                    prefix,
                    rule.key,
                    scalar_text(&rule.value),
                    missing.join(", ")
                )));
            }
        }

        Ok(out)
    }
}

impl OptionSpec {
    fn coerce(&self, value: &Value, path: &str) -> ModuleResult<Value> {
        let coerced = coerce_value(self.arg_type, value, path)?;

        match (&coerced, &self.suboptions) {
            (Value::Object(map), Some(sub)) => {
                Ok(Value::Object(sub.validate_object(map, &format!("{}.", path))?))
            }
            (Value::Array(items), _) => {
                let element = self.elements.unwrap_or(ArgType::Raw);
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    let item = coerce_value(element, item, &item_path)?;
                    let item = match (&item, &self.suboptions) {
                        (Value::Object(map), Some(sub)) => {
                            Value::Object(sub.validate_object(map, &format!("{}.", item_path))?)
                        }
                        _ => item,
                    };
                    out.push(item);
                }
                Ok(Value::Array(out))
            }
            _ => Ok(coerced),
        }
    }

    fn check_choices(&self, value: &Value, path: &str) -> ModuleResult<()> {
        if self.choices.is_empty() {
            return Ok(());
        }
        let candidates: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for candidate in candidates {
            if !self.choices.iter().any(|c| values_equal(c, candidate)) {
                let allowed: Vec<String> = self.choices.iter().map(scalar_text).collect();
                return Err(ModuleError::InvalidParameter(format!(
                    "value of {} must be one of: {}, got: {}",
                    path,
                    allowed.join(", "),
                    scalar_text(candidate)
                )));
            }
        }
        Ok(())
    }
}

fn type_error(path: &str, expected: ArgType, value: &Value) -> ModuleError {
    ModuleError::InvalidParameter(format!(
        "{} must be of type {}, got {}",
        path,
        expected,
        scalar_text(value)
    ))
}

/// Coerce one value into `arg_type`, accepting the usual string spellings.
fn coerce_value(arg_type: ArgType, value: &Value, path: &str) -> ModuleResult<Value> {
    match arg_type {
        ArgType::Raw => Ok(value.clone()),
        ArgType::Str => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(type_error(path, arg_type, value)),
        },
        ArgType::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err(type_error(path, arg_type, value)),
            },
            Value::Number(n) if n.as_i64() == Some(0) || n.as_i64() == Some(1) => {
                Ok(Value::Bool(n.as_i64() == Some(1)))
            }
            _ => Err(type_error(path, arg_type, value)),
        },
        ArgType::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| type_error(path, arg_type, value)),
            _ => Err(type_error(path, arg_type, value)),
        },
        ArgType::Dict => match value {
            Value::Object(_) => Ok(value.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => Ok(parsed),
                _ => Err(type_error(path, arg_type, value)),
            },
            _ => Err(type_error(path, arg_type, value)),
        },
        ArgType::List => match value {
            Value::Array(_) => Ok(value.clone()),
            Value::String(s) => Ok(Value::Array(
                s.split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .filter(|item| item.as_str() != Some(""))
                    .collect(),
            )),
            Value::Object(_) => Err(type_error(path, arg_type, value)),
            other => Ok(Value::Array(vec![other.clone()])),
        },
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x == y,
        _ => scalar_text(a) == scalar_text(b),
    }
}

/// Text form of a scalar for messages and comparisons.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Arguments that passed validation.
#[derive(Debug, Clone, Default)]
pub struct ValidatedArgs {
    values: Map<String, Value>,
    secrets: Vec<Vec<String>>,
}

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    /// Whether the option has a non-null value.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Deserialize into a typed view; unknown fields are ignored by the target.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ModuleResult<T> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|e| ModuleError::InvalidParameter(e.to_string()))
    }

    /// Copy safe to log: `no_log` values are replaced by [`REDACTED`].
    pub fn redacted(&self) -> Value {
        let mut values = Value::Object(self.values.clone());
        for secret in &self.secrets {
            redact(&mut values, secret);
        }
        values
    }
}

fn redact(value: &mut Value, path: &[String]) {
    let Some((head, rest)) = path.split_first() else {
        *value = Value::String(REDACTED.to_string());
        return;
    };
    match value {
        Value::Array(items) if head == "*" => {
            for item in items {
                redact(item, rest);
            }
        }
        Value::Object(map) => {
            if let Some(child) = map.get_mut(head) {
                redact(child, rest);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> ModuleParams {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => ModuleParams::new(),
        }
    }

    fn spec() -> ArgSpec {
        ArgSpec::new()
            .option("name", OptionSpec::str().required())
            .option("resource_group", OptionSpec::str().aliases(&["resource_group_name"]))
            .option("state", OptionSpec::str().default(json!("present")).choices(&["present", "absent"]))
            .option("enabled", OptionSpec::bool())
            .option("count", OptionSpec::int())
            .option("secret", OptionSpec::str().no_log())
            .option(
                "subnets",
                OptionSpec::list(ArgType::Dict).suboptions(
                    ArgSpec::new()
                        .option("name", OptionSpec::str().required())
                        .option("address_prefix", OptionSpec::str()),
                ),
            )
            .required_if("state", json!("present"), &["resource_group"])
    }

    #[test]
    fn test_defaults_and_aliases() {
        let args = spec()
            .validate(&params(json!({"name": "a", "resource_group_name": "rg"})))
            .unwrap();
        assert_eq!(args.str("resource_group"), Some("rg"));
        assert_eq!(args.str("state"), Some("present"));
        assert!(!args.has("enabled"));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = spec()
            .validate(&params(json!({"name": "a", "resource_group": "rg", "colour": "blue"})))
            .unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_required_and_required_if() {
        let err = spec().validate(&params(json!({"resource_group": "rg"}))).unwrap_err();
        assert!(matches!(err, ModuleError::MissingParameter(ref p) if p == "name"));

        let err = spec().validate(&params(json!({"name": "a"}))).unwrap_err();
        assert!(err.to_string().contains("resource_group"));

        assert!(spec()
            .validate(&params(json!({"name": "a", "state": "absent"})))
            .is_ok());
    }

    #[test]
    fn test_choices() {
        let err = spec()
            .validate(&params(json!({"name": "a", "state": "gone"})))
            .unwrap_err();
        assert!(err.to_string().contains("present, absent"));
    }

    #[test]
    fn test_type_coercion() {
        let args = spec()
            .validate(&params(json!({"name": 5, "resource_group": "rg", "enabled": "yes", "count": "3"})))
            .unwrap();
        assert_eq!(args.str("name"), Some("5"));
        assert_eq!(args.get("enabled"), Some(&json!(true)));
        assert_eq!(args.get("count"), Some(&json!(3)));

        let err = spec()
            .validate(&params(json!({"name": "a", "resource_group": "rg", "count": "many"})))
            .unwrap_err();
        assert!(err.to_string().contains("count must be of type int"));
    }

    #[test]
    fn test_suboptions_validated() {
        let err = spec()
            .validate(&params(json!({
                "name": "a",
                "resource_group": "rg",
                "subnets": [{"address_prefix": "10.0.0.0/24"}]
            })))
            .unwrap_err();
        assert!(err.to_string().contains("subnets[0].name"));
    }

    #[test]
    fn test_redacted() {
        let args = spec()
            .validate(&params(json!({"name": "a", "resource_group": "rg", "secret": "hunter2"})))
            .unwrap();
        assert_eq!(args.redacted()["secret"], REDACTED);
        assert_eq!(args.str("secret"), Some("hunter2"));
    }

    #[test]
    fn test_redacted_suboptions() {
        let spec = ArgSpec::new()
            .option(
                "administrator",
                OptionSpec::dict().suboptions(
                    ArgSpec::new()
                        .option("login", OptionSpec::str())
                        .option("password", OptionSpec::str().no_log()),
                ),
            )
            .option(
                "users",
                OptionSpec::list(ArgType::Dict).suboptions(
                    ArgSpec::new()
                        .option("name", OptionSpec::str())
                        .option("key", OptionSpec::str().no_log()),
                ),
            );
        let args = spec
            .validate(&params(json!({
                "administrator": {"login": "admin", "password": "hunter2"},
                "users": [{"name": "a", "key": "k1"}, {"name": "b"}]
            })))
            .unwrap();

        let redacted = args.redacted();
        assert_eq!(redacted["administrator"]["password"], REDACTED);
        assert_eq!(redacted["administrator"]["login"], "admin");
        assert_eq!(redacted["users"][0]["key"], REDACTED);
        assert!(redacted["users"][1].get("key").is_none());
        assert!(!redacted.to_string().contains("hunter2"));
        assert_eq!(args.get("administrator").unwrap()["password"], "hunter2");
    }
}
