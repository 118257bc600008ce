//! `azure_rm_containerregistry`

use super::{LocationPolicy, ResourceDescriptor};
use crate::modules::info::ReadRoute;
use crate::schema::{ArgSpec, Comparison, OptionSpec};
use serde_json::json;

pub static CONTAINER_REGISTRY: ResourceDescriptor = ResourceDescriptor {
    module: "azure_rm_containerregistry",
    info_module: "azure_rm_containerregistry_info",
    display: "container registry",
    description: "Manage Azure Container Registry instances",
    resource_type: "Microsoft.ContainerRegistry/registries",
    api_version: "2019-05-01",
    path: "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.ContainerRegistry/registries/{name}",
    location: LocationPolicy::InheritFromResourceGroup,
    info_key: "registries",
    routes: &ROUTES,
    options,
    guard_nonempty: false,
};

static ROUTES: [ReadRoute; 3] = [
    ReadRoute::get(
        "get",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.ContainerRegistry/registries/{name}",
    ),
    ReadRoute::list(
        "list_by_resource_group",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.ContainerRegistry/registries",
    ),
    ReadRoute::list(
        "list",
        "/subscriptions/{subscription_id}/providers/Microsoft.ContainerRegistry/registries",
    ),
];

fn options() -> ArgSpec {
    ArgSpec::new()
        .option(
            "location",
            OptionSpec::str()
                .disposition("/")
                .comparison(Comparison::Location)
                .not_updatable()
                .doc("Defaults to the location of the resource group."),
        )
        .option(
            "sku",
            OptionSpec::str()
                .disposition("/sku/name")
                .default(json!("Standard"))
                .choices(&["Basic", "Standard", "Premium"])
                .doc("Registry SKU."),
        )
        .option(
            "admin_user_enabled",
            OptionSpec::bool()
                .disposition("/properties/*")
                .default(json!(false))
                .doc("Enable the admin user."),
        )
}
