//! Tencent Cloud resource and data source schema definitions

pub mod cbs;
pub mod cvm;
pub mod tcaplus;
pub mod tsf;
pub mod vpc;

use tccloud_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Schema constructor of one resource type or data source
pub type SchemaFn = fn() -> ResourceSchema;

/// Managed resource types, by name
pub const RESOURCES: &[(&str, SchemaFn)] = &[
    ("instance", cvm::instance_schema),
    ("cbs_storage", cbs::storage_schema),
    ("cbs_storage_attachment", cbs::storage_attachment_schema),
    ("cbs_snapshot", cbs::snapshot_schema),
    ("vpc", vpc::vpc_schema),
    ("subnet", vpc::subnet_schema),
    ("route_table", vpc::route_table_schema),
    ("route_entry", vpc::route_entry_schema),
    ("security_group", vpc::security_group_schema),
    ("tcaplus_application", tcaplus::application_schema),
    ("tcaplus_zone", tcaplus::zone_schema),
    ("tcaplus_idl", tcaplus::idl_schema),
    ("tcaplus_table", tcaplus::table_schema),
    ("tsf_namespace", tsf::namespace_schema),
    ("tsf_application", tsf::application_schema),
    ("tsf_group", tsf::group_schema),
    ("tsf_api_group", tsf::api_group_schema),
    ("tsf_bind_api_group", tsf::bind_api_group_schema),
    ("tsf_application_config", tsf::application_config_schema),
    ("tsf_application_release_config", tsf::application_release_config_schema),
];

/// Data sources, by name
pub const DATA_SOURCES: &[(&str, SchemaFn)] = &[
    ("instances", cvm::instances_schema),
    ("instance_types", cvm::instance_types_schema),
    ("cbs_storages", cbs::storages_schema),
    ("cbs_snapshots", cbs::snapshots_schema),
    ("vpc_instances", vpc::vpc_instances_schema),
    ("vpc_subnets", vpc::vpc_subnets_schema),
    ("vpc_route_tables", vpc::vpc_route_tables_schema),
    ("security_groups", vpc::security_groups_schema),
    ("tcaplus_applications", tcaplus::applications_schema),
    ("tcaplus_zones", tcaplus::zones_schema),
    ("tcaplus_tables", tcaplus::tables_schema),
    ("tcaplus_idls", tcaplus::idls_schema),
    ("tsf_applications", tsf::applications_schema),
];

/// Schema of a managed resource type
pub fn resource_schema(resource_type: &str) -> Option<ResourceSchema> {
    lookup(RESOURCES, resource_type)
}

/// Schema of a data source
pub fn data_source_schema(name: &str) -> Option<ResourceSchema> {
    lookup(DATA_SOURCES, name)
}

fn lookup(table: &[(&str, SchemaFn)], name: &str) -> Option<ResourceSchema> {
    table
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, schema)| schema())
}

/// Returns all schemas, resources first
pub fn all_schemas() -> Vec<ResourceSchema> {
    RESOURCES
        .iter()
        .chain(DATA_SOURCES)
        .map(|(_, schema)| schema())
        .collect()
}

/// Resource tags as a string map
pub fn tags_type() -> AttributeType {
    AttributeType::Map(Box::new(AttributeType::String))
}

pub fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

/// Computed list of result objects returned by a data source
pub fn result_list(name: &str, description: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::List(Box::new(AttributeType::Map(Box::new(
        AttributeType::String,
    )))))
    .computed()
    .with_description(description)
}

/// Generic `{name = [values]}` filter map of the describe data sources
pub fn filters_attribute() -> AttributeSchema {
    AttributeSchema::new("filters", AttributeType::Map(Box::new(string_list())))
        .with_description("Raw describe filters: filter name to at most 5 values")
}
