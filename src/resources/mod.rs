//! Azure resources exposed as modules.
//!
//! Each resource is a static [`ResourceDescriptor`]: its ARM path, pinned
//! api-version, read routes for the `_info` module and the body options the
//! management module accepts.

pub mod api_management;
pub mod container_registry;
pub mod private_dns_zone;
pub mod resource_group;
pub mod sql_database;
pub mod virtual_network;

use crate::azure::placeholders;
use crate::modules::info::ReadRoute;
use crate::schema::ArgSpec;

/// Where the `location` of a new resource comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationPolicy {
    /// The caller must pass `location` when creating.
    Required,
    /// Defaults to the location of the enclosing resource group.
    InheritFromResourceGroup,
    /// Always this value, e.g. `global`.
    Fixed(&'static str),
}

/// Static description of one ARM resource type.
#[derive(Debug)]
pub struct ResourceDescriptor {
    /// Management module name.
    pub module: &'static str,
    /// Info module name, `<module>_info`.
    pub info_module: &'static str,
    /// Human name used in messages.
    pub display: &'static str,
    pub description: &'static str,
    pub resource_type: &'static str,
    pub api_version: &'static str,
    /// Path template of a single resource.
    pub path: &'static str,
    pub location: LocationPolicy,
    /// Key the info module returns its list under.
    pub info_key: &'static str,
    /// Read routes, most specific first.
    pub routes: &'static [ReadRoute],
    /// Resource-specific options; identity, tags and auth options are added by the modules.
    pub options: fn() -> ArgSpec,
    /// Refuse to delete while the resource still contains other resources.
    pub guard_nonempty: bool,
}

impl ResourceDescriptor {
    /// Options that identify the resource (`resource_group`, `server_name`, `name`).
    pub fn identity(&self) -> Vec<String> {
        placeholders(self.path)
            .into_iter()
            .filter(|p| p != "subscription_id")
            .collect()
    }
}

static ALL: [&ResourceDescriptor; 6] = [
    &resource_group::RESOURCE_GROUP,
    &container_registry::CONTAINER_REGISTRY,
    &virtual_network::VIRTUAL_NETWORK,
    &sql_database::SQL_DATABASE,
    &private_dns_zone::PRIVATE_DNS_ZONE,
    &api_management::API_MANAGEMENT_SERVICE,
];

/// Every resource, in registration order.
pub fn all() -> &'static [&'static ResourceDescriptor] {
    &ALL
}

/// Path template of the resource group holding a resource.
pub const RESOURCE_GROUP_PATH: &str = "/subscriptions/{subscription_id}/resourceGroups/{resource_group}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_path() {
        assert_eq!(
            sql_database::SQL_DATABASE.identity(),
            vec!["resource_group", "server_name", "name"]
        );
        assert_eq!(resource_group::RESOURCE_GROUP.identity(), vec!["name"]);
    }

    #[test]
    fn test_routes_render_from_identity() {
        for descriptor in all() {
            let identity = descriptor.identity();
            assert!(!descriptor.routes.is_empty(), "{}", descriptor.module);
            for route in descriptor.routes {
                for required in route.requires() {
                    assert!(
                        identity.contains(&required),
                        "{} route {} needs unknown option {}",
                        descriptor.module,
                        route.operation,
                        required
                    );
                }
            }
        }
    }

    #[test]
    fn test_info_module_names() {
        for descriptor in all() {
            assert_eq!(descriptor.info_module, format!("{}_info", descriptor.module));
        }
    }

    #[test]
    fn test_option_specs_build() {
        for descriptor in all() {
            let spec = (descriptor.options)();
            for name in descriptor.identity() {
                assert!(spec.get(&name).is_none(), "{} redeclares {}", descriptor.module, name);
            }
        }
    }
}
