//! Request body construction and result key conversion.
//!
//! Option values are placed into the ARM body according to their
//! disposition:
//!
//! | Disposition     | Lands at                      |
//! |-----------------|-------------------------------|
//! | `*` or `/`      | `camelName` at the current level |
//! | `/properties/*` | `properties.camelName`        |
//! | `/sku/name`     | `sku.name`                    |
//!
//! Top-level options without a disposition (identity, auth, state) never
//! reach the body. Suboptions default to `*`.

use super::{ArgSpec, OptionSpec, ValidatedArgs};
use crate::azure::render_path;
use crate::azure::resource_id::is_resource_id;
use crate::modules::{ModuleError, ModuleResult};
use serde_json::{Map, Value};

/// `address_prefixes` -> `addressPrefixes`.
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, part) in name.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `addressSpace` -> `address_space`, `IPAddress` -> `ip_address`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert every object key to snake_case. Tag names are left as given.
pub fn snake_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if k == "tags" { v.clone() } else { snake_keys(v) };
                    (snake_case(k), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(snake_keys).collect()),
        other => other.clone(),
    }
}

/// Body path segments for an option.
pub fn disposition_path(name: &str, disposition: &str) -> Vec<String> {
    let camel = camelize(name);
    let rest = disposition.trim_start_matches('/');
    if rest.is_empty() {
        return vec![camel];
    }
    rest.split('/')
        .filter(|part| !part.is_empty())
        .map(|part| if part == "*" { camel.clone() } else { part.to_string() })
        .collect()
}

/// Disposition that applies to an option at this nesting level.
pub(crate) fn effective_disposition(spec: &OptionSpec, nested: bool) -> Option<&str> {
    match spec.disposition.as_deref() {
        Some(d) => Some(d),
        None if nested => Some("*"),
        None => None,
    }
}

fn set_path(target: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = target;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.clone(), value);
}

struct Inflater<'a> {
    args: &'a ValidatedArgs,
    subscription_id: &'a str,
}

impl Inflater<'_> {
    fn object(&self, spec: &ArgSpec, values: &Map<String, Value>, nested: bool) -> ModuleResult<Value> {
        let mut out = Map::new();
        for (name, option) in &spec.options {
            let Some(value) = values.get(name).filter(|v| !v.is_null()) else {
                continue;
            };
            let Some(disposition) = effective_disposition(option, nested) else {
                continue;
            };
            let value = self.value(name, option, value)?;
            set_path(&mut out, &disposition_path(name, disposition), value);
        }
        Ok(Value::Object(out))
    }

    fn value(&self, name: &str, option: &OptionSpec, value: &Value) -> ModuleResult<Value> {
        match (value, &option.suboptions) {
            (Value::Object(map), Some(sub)) => self.object(sub, map, true),
            (Value::Array(items), _) => items
                .iter()
                .map(|item| self.value(name, option, item))
                .collect::<ModuleResult<Vec<_>>>()
                .map(Value::Array),
            (Value::String(s), None) => match &option.resource_reference {
                Some(template) => self.reference(name, template, s).map(Value::String),
                None => Ok(value.clone()),
            },
            _ => Ok(value.clone()),
        }
    }

    /// Expand a bare name into a full id; full ids pass through.
    fn reference(&self, name: &str, template: &str, value: &str) -> ModuleResult<String> {
        if is_resource_id(value) {
            return Ok(value.to_string());
        }
        render_path(template, |key| match key {
            "value" => Some(value.to_string()),
            "subscription_id" => Some(self.subscription_id.to_string()),
            other => self.args.str(other).map(str::to_string),
        })
        .map_err(|missing| {
            ModuleError::MissingParameter(format!(
                "{} is required to resolve {} '{}'",
                missing, name, value
            ))
        })
    }
}

/// Build the ARM request body from validated arguments.
pub fn inflate(spec: &ArgSpec, args: &ValidatedArgs, subscription_id: &str) -> ModuleResult<Value> {
    Inflater {
        args,
        subscription_id,
    }
    .object(spec, args.values(), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ModuleParams;
    use crate::schema::{ArgType, OptionSpec};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_camelize_and_snake_case() {
        assert_eq!(camelize("address_prefixes"), "addressPrefixes");
        assert_eq!(camelize("name"), "name");
        assert_eq!(snake_case("addressSpace"), "address_space");
        assert_eq!(snake_case("provisioningState"), "provisioning_state");
        assert_eq!(snake_case("publicIPAddress"), "public_ip_address");
        assert_eq!(snake_case("id"), "id");
    }

    #[test]
    fn test_snake_keys_keeps_tags() {
        let value = json!({"properties": {"adminUserEnabled": true}, "tags": {"CostCenter": "1"}});
        assert_eq!(
            snake_keys(&value),
            json!({"properties": {"admin_user_enabled": true}, "tags": {"CostCenter": "1"}})
        );
    }

    #[test]
    fn test_disposition_path() {
        assert_eq!(disposition_path("location", "/"), vec!["location"]);
        assert_eq!(disposition_path("dns_servers", "/properties/dhcpOptions/dnsServers"), vec!["properties", "dhcpOptions", "dnsServers"]);
        assert_eq!(disposition_path("admin_user_enabled", "/properties/*"), vec!["properties", "adminUserEnabled"]);
        assert_eq!(disposition_path("tier", "*"), vec!["tier"]);
    }

    #[test]
    fn test_inflate() {
        let spec = ArgSpec::new()
            .option("resource_group", OptionSpec::str().required())
            .option("name", OptionSpec::str().required())
            .option("location", OptionSpec::str().disposition("/"))
            .option("sku", OptionSpec::str().disposition("/sku/name"))
            .option("address_prefixes", OptionSpec::list(ArgType::Str).disposition("/properties/addressSpace/addressPrefixes"))
            .option(
                "subnets",
                OptionSpec::list(ArgType::Dict).disposition("/properties/*").suboptions(
                    ArgSpec::new()
                        .option("name", OptionSpec::str())
                        .option("address_prefix", OptionSpec::str().disposition("/properties/*")),
                ),
            )
            .option(
                "elastic_pool",
                OptionSpec::str()
                    .disposition("/properties/elasticPoolId")
                    .reference("/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Sql/servers/{server}/elasticPools/{value}"),
            )
            .option("server", OptionSpec::str());

        let params: ModuleParams = match json!({
            "resource_group": "rg",
            "name": "net",
            "location": "eastus",
            "sku": "Basic",
            "address_prefixes": ["10.0.0.0/16"],
            "subnets": [{"name": "default", "address_prefix": "10.0.0.0/24"}],
            "elastic_pool": "pool1",
            "server": "srv"
        }) {
            Value::Object(map) => map.into_iter().collect(),
            _ => unreachable!(),
        };
        let args = spec.validate(&params).unwrap();
        let body = inflate(&spec, &args, "sub").unwrap();

        assert_eq!(
            body,
            json!({
                "location": "eastus",
                "sku": {"name": "Basic"},
                "properties": {
                    "addressSpace": {"addressPrefixes": ["10.0.0.0/16"]},
                    "subnets": [{"name": "default", "properties": {"addressPrefix": "10.0.0.0/24"}}],
                    "elasticPoolId": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Sql/servers/srv/elasticPools/pool1"
                }
            })
        );
    }

    #[test]
    fn test_reference_accepts_full_id() {
        let spec = ArgSpec::new().option(
            "pool",
            OptionSpec::str().disposition("/properties/poolId").reference("/x/{missing}/{value}"),
        );
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Sql/servers/srv/elasticPools/p";
        let params: ModuleParams = [("pool".to_string(), json!(id))].into_iter().collect();
        let args = spec.validate(&params).unwrap();
        assert_eq!(inflate(&spec, &args, "s").unwrap()["properties"]["poolId"], id);
    }
}
