//! `azure_rm_resourcegroup`

use super::{LocationPolicy, ResourceDescriptor};
use crate::modules::info::ReadRoute;
use crate::schema::{ArgSpec, Comparison, OptionSpec};
use serde_json::json;

pub static RESOURCE_GROUP: ResourceDescriptor = ResourceDescriptor {
    module: "azure_rm_resourcegroup",
    info_module: "azure_rm_resourcegroup_info",
    display: "resource group",
    description: "Manage Azure resource groups",
    resource_type: "Microsoft.Resources/resourceGroups",
    api_version: "2021-04-01",
    path: "/subscriptions/{subscription_id}/resourcegroups/{name}",
    location: LocationPolicy::Required,
    info_key: "resourcegroups",
    routes: &ROUTES,
    options,
    guard_nonempty: true,
};

static ROUTES: [ReadRoute; 2] = [
    ReadRoute::get("get", "/subscriptions/{subscription_id}/resourcegroups/{name}"),
    ReadRoute::list("list", "/subscriptions/{subscription_id}/resourcegroups"),
];

fn options() -> ArgSpec {
    ArgSpec::new()
        .option(
            "location",
            OptionSpec::str()
                .disposition("/")
                .comparison(Comparison::Location)
                .not_updatable()
                .doc("Azure location of the resource group. Required when creating."),
        )
        .option(
            "force_delete_nonempty",
            OptionSpec::bool()
                .default(json!(false))
                .doc("Delete the resource group even when it still contains resources."),
        )
}
