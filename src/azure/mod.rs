//! Azure Resource Manager plumbing shared by all modules.
//!
//! - [`auth`]: credential resolution and token sources
//! - [`client`]: the [`ArmClient`] capability and its HTTP implementation
//! - [`lro`]: long-running operation protocol helpers
//! - [`mock`]: in-memory client used by tests

pub mod auth;
pub mod client;
pub mod cloud;
pub mod error;
pub mod lro;
pub mod mock;
pub mod resource_id;

pub use auth::{AuthOptions, AuthSource, TokenCredential};
pub use client::{ArmClient, HttpArmClient};
pub use cloud::CloudEnvironment;
pub use error::{ArmError, ArmResult};
pub use mock::MockArmClient;
pub use resource_id::ResourceId;

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("Invalid placeholder regex"));

/// Render an ARM path template such as
/// `/subscriptions/{subscription_id}/resourceGroups/{resource_group}`.
///
/// Values are percent-encoded. Returns the first placeholder `lookup` could
/// not resolve as the error.
pub fn render_path<F>(template: &str, lookup: F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len() + 64);
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = lookup(name.as_str()).ok_or_else(|| name.as_str().to_string())?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(&urlencoding::encode(&value));
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Placeholder names used by a template, in order.
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_path() {
        let path = render_path(
            "/subscriptions/{subscription_id}/resourceGroups/{resource_group}",
            |name| match name {
                "subscription_id" => Some("sub".to_string()),
                "resource_group" => Some("my rg".to_string()),
                _ => None,
            },
        )
        .unwrap();
        assert_eq!(path, "/subscriptions/sub/resourceGroups/my%20rg");
    }

    #[test]
    fn test_render_path_missing() {
        let err = render_path("/subscriptions/{subscription_id}/x/{name}", |name| {
            (name == "subscription_id").then(|| "sub".to_string())
        })
        .unwrap_err();
        assert_eq!(err, "name");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            placeholders("/a/{resource_group}/b/{server_name}/c/{name}"),
            vec!["resource_group", "server_name", "name"]
        );
    }
}
