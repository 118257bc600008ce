//! `azure_rm_privatednszone`

use super::{LocationPolicy, ResourceDescriptor};
use crate::modules::info::ReadRoute;
use crate::schema::ArgSpec;

/// Private DNS zones are global; only tags can change after creation.
pub static PRIVATE_DNS_ZONE: ResourceDescriptor = ResourceDescriptor {
    module: "azure_rm_privatednszone",
    info_module: "azure_rm_privatednszone_info",
    display: "private DNS zone",
    description: "Manage Azure private DNS zones",
    resource_type: "Microsoft.Network/privateDnsZones",
    api_version: "2018-09-01",
    path: "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Network/privateDnsZones/{name}",
    location: LocationPolicy::Fixed("global"),
    info_key: "privatednszones",
    routes: &ROUTES,
    options: ArgSpec::new,
    guard_nonempty: false,
};

static ROUTES: [ReadRoute; 3] = [
    ReadRoute::get(
        "get",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Network/privateDnsZones/{name}",
    ),
    ReadRoute::list(
        "list_by_resource_group",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Network/privateDnsZones",
    ),
    ReadRoute::list(
        "list",
        "/subscriptions/{subscription_id}/providers/Microsoft.Network/privateDnsZones",
    ),
];
