//! `azure_rm_apimanagementservice`

use super::{LocationPolicy, ResourceDescriptor};
use crate::modules::info::ReadRoute;
use crate::schema::{ArgSpec, Comparison, OptionSpec};
use serde_json::json;

pub static API_MANAGEMENT_SERVICE: ResourceDescriptor = ResourceDescriptor {
    module: "azure_rm_apimanagementservice",
    info_module: "azure_rm_apimanagementservice_info",
    display: "API Management service",
    description: "Manage Azure API Management services",
    resource_type: "Microsoft.ApiManagement/service",
    api_version: "2021-08-01",
    path: "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.ApiManagement/service/{name}",
    location: LocationPolicy::InheritFromResourceGroup,
    info_key: "api_management_services",
    routes: &ROUTES,
    options,
    guard_nonempty: false,
};

static ROUTES: [ReadRoute; 3] = [
    ReadRoute::get(
        "get",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.ApiManagement/service/{name}",
    ),
    ReadRoute::list(
        "list_by_resource_group",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.ApiManagement/service",
    ),
    ReadRoute::list(
        "list",
        "/subscriptions/{subscription_id}/providers/Microsoft.ApiManagement/service",
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
            "publisher_email",
            OptionSpec::str()
                .disposition("/properties/*")
                .doc("Notification address of the publisher."),
        )
        .option(
            "publisher_name",
            OptionSpec::str()
                .disposition("/properties/*")
                .comparison(Comparison::Sensitive)
                .doc("Name of the publishing organization."),
        )
        .option(
            "sku_name",
            OptionSpec::str()
                .disposition("/sku/name")
                .choices(&["Developer", "Standard", "Premium", "Basic", "Consumption"]),
        )
        .option(
            "sku_capacity",
            OptionSpec::int()
                .disposition("/sku/capacity")
                .default(json!(1)),
        )
        .option(
            "virtual_network_type",
            OptionSpec::str()
                .disposition("/properties/virtualNetworkType")
                .choices(&["None", "External", "Internal"]),
        )
        .required_if(
            "state",
            json!("present"),
            &["publisher_email", "publisher_name", "sku_name"],
        )
}
