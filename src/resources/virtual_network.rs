//! `azure_rm_virtualnetwork`

use super::{LocationPolicy, ResourceDescriptor};
use crate::modules::info::ReadRoute;
use crate::schema::{ArgSpec, ArgType, Comparison, OptionSpec};

pub static VIRTUAL_NETWORK: ResourceDescriptor = ResourceDescriptor {
    module: "azure_rm_virtualnetwork",
    info_module: "azure_rm_virtualnetwork_info",
    display: "virtual network",
    description: "Manage Azure virtual networks",
    resource_type: "Microsoft.Network/virtualNetworks",
    api_version: "2020-11-01",
    path: "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Network/virtualNetworks/{name}",
    location: LocationPolicy::InheritFromResourceGroup,
    info_key: "virtualnetworks",
    routes: &ROUTES,
    options,
    guard_nonempty: false,
};

static ROUTES: [ReadRoute; 3] = [
    ReadRoute::get(
        "get",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Network/virtualNetworks/{name}",
    ),
    ReadRoute::list(
        "list",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Network/virtualNetworks",
    ),
    ReadRoute::list(
        "list_all",
        "/subscriptions/{subscription_id}/providers/Microsoft.Network/virtualNetworks",
    ),
];

fn subnet_options() -> ArgSpec {
    ArgSpec::new()
        .option("name", OptionSpec::str().required().doc("Subnet name."))
        .option(
            "address_prefix",
            OptionSpec::str()
                .required()
                .disposition("/properties/*")
                .doc("CIDR of the subnet."),
        )
}

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
            "address_prefixes",
            OptionSpec::list(ArgType::Str)
                .aliases(&["address_prefixes_cidr"])
                .disposition("/properties/addressSpace/addressPrefixes")
                .doc("CIDR blocks of the address space."),
        )
        .option(
            "dns_servers",
            OptionSpec::list(ArgType::Str)
                .disposition("/properties/dhcpOptions/dnsServers")
                .doc("Custom DNS servers."),
        )
        .option(
            "enable_ddos_protection",
            OptionSpec::bool()
                .disposition("/properties/*")
                .doc("Enable DDoS protection standard."),
        )
        .option(
            "subnets",
            OptionSpec::list(ArgType::Dict)
                .disposition("/properties/*")
                .key("name")
                .suboptions(subnet_options())
                .doc("Subnets declared inline with the network."),
        )
}
