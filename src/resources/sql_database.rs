//! `azure_rm_sqldatabase`
//!
//! Databases live under a logical SQL server, so both `server_name` and the
//! resource group identify them and listing is per server.

use super::{LocationPolicy, ResourceDescriptor};
use crate::modules::info::ReadRoute;
use crate::schema::{ArgSpec, Comparison, OptionSpec};

pub static SQL_DATABASE: ResourceDescriptor = ResourceDescriptor {
    module: "azure_rm_sqldatabase",
    info_module: "azure_rm_sqldatabase_info",
    display: "SQL database",
    description: "Manage Azure SQL databases",
    resource_type: "Microsoft.Sql/servers/databases",
    api_version: "2021-11-01",
    path: "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Sql/servers/{server_name}/databases/{name}",
    location: LocationPolicy::InheritFromResourceGroup,
    info_key: "databases",
    routes: &ROUTES,
    options,
    guard_nonempty: false,
};

static ROUTES: [ReadRoute; 2] = [
    ReadRoute::get(
        "get",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Sql/servers/{server_name}/databases/{name}",
    ),
    ReadRoute::list(
        "list_by_server",
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Sql/servers/{server_name}/databases",
    ),
];

const ELASTIC_POOL_ID: &str = "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Sql/servers/{server_name}/elasticPools/{value}";

fn sku_options() -> ArgSpec {
    ArgSpec::new()
        .option("name", OptionSpec::str().required().doc("SKU name, e.g. S0 or GP_Gen5."))
        .option("tier", OptionSpec::str().doc("Service tier, e.g. Standard."))
        .option("size", OptionSpec::str())
        .option("family", OptionSpec::str())
        .option("capacity", OptionSpec::int().doc("DTUs or vCores."))
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
            "collation",
            OptionSpec::str()
                .disposition("/properties/*")
                .not_updatable()
                .doc("Collation of the database; fixed at creation."),
        )
        .option(
            "create_mode",
            OptionSpec::str()
                .disposition("/properties/*")
                .not_updatable()
                .choices(&[
                    "Default",
                    "Copy",
                    "Secondary",
                    "PointInTimeRestore",
                    "Restore",
                    "Recovery",
                    "RestoreExternalBackup",
                    "OnlineSecondary",
                ]),
        )
        .option(
            "source_database_id",
            OptionSpec::str()
                .disposition("/properties/sourceDatabaseId")
                .comparison(Comparison::Ignore)
                .doc("Source database for Copy, Secondary and restore modes."),
        )
        .option(
            "max_size_bytes",
            OptionSpec::int()
                .disposition("/properties/maxSizeBytes")
                .doc("Maximum size of the database in bytes."),
        )
        .option(
            "elastic_pool_name",
            OptionSpec::str()
                .disposition("/properties/elasticPoolId")
                .reference(ELASTIC_POOL_ID)
                .doc("Elastic pool name or id."),
        )
        .option(
            "read_scale",
            OptionSpec::str()
                .disposition("/properties/*")
                .choices(&["Enabled", "Disabled"]),
        )
        .option("zone_redundant", OptionSpec::bool().disposition("/properties/*"))
        .option(
            "sku",
            OptionSpec::dict()
                .disposition("/")
                .suboptions(sku_options())
                .doc("Database SKU."),
        )
}
