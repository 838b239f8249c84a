//! TSF schema definitions

use tccloud_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::result_list;

pub const APPLICATION_TYPES: &[&str] = &["V", "C", "S"];
pub const MICROSERVICE_TYPES: &[&str] = &["N", "M", "G", "RPC"];

fn string(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
}

fn created_string(name: &str) -> AttributeSchema {
    string(name).computed()
}

pub fn namespace_schema() -> ResourceSchema {
    ResourceSchema::new("tsf_namespace")
        .with_description("A TSF namespace")
        .attribute(string("namespace_name").required())
        .attribute(string("cluster_id").computed().optional().force_new())
        .attribute(string("namespace_desc"))
        .attribute(
            AttributeSchema::new("namespace_resource_type", types::allowed_strings(&["DEF", "GW"]))
                .computed()
                .optional()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("namespace_type", types::allowed_strings(&["DEF", "GLOBAL"]))
                .computed()
                .optional()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("is_ha_enable", types::allowed_strings(&["0", "1"]))
                .computed()
                .optional()
                .with_description("High availability switch: 1 on, 0 off"),
        )
        .attribute(string("program_id").write_only())
        .attribute(created_string("namespace_code"))
        .attribute(created_string("namespace_status"))
        .attribute(created_string("is_default"))
        .attribute(created_string("create_time"))
}

pub fn application_schema() -> ResourceSchema {
    ResourceSchema::new("tsf_application")
        .with_description("A TSF application")
        .attribute(string("application_name").required())
        .attribute(
            AttributeSchema::new("application_type", types::allowed_strings(APPLICATION_TYPES))
                .required()
                .force_new()
                .with_description("V: virtual machine, C: container, S: serverless"),
        )
        .attribute(
            AttributeSchema::new("microservice_type", types::allowed_strings(MICROSERVICE_TYPES))
                .required()
                .force_new()
                .with_description("N: none, M: service mesh, G: general, RPC"),
        )
        .attribute(string("application_desc"))
        .attribute(string("application_runtime_type").computed().optional().force_new())
        .attribute(string("program_id").write_only())
        .attribute(created_string("create_time"))
}

pub fn group_schema() -> ResourceSchema {
    ResourceSchema::new("tsf_group")
        .with_description("A TSF deploy group")
        .attribute(string("application_id").required().force_new())
        .attribute(string("namespace_id").required().force_new())
        .attribute(string("group_name").required())
        .attribute(string("cluster_id").required().force_new())
        .attribute(string("group_desc"))
        .attribute(
            AttributeSchema::new("group_resource_type", types::allowed_strings(&["DEF", "GW"]))
                .computed()
                .optional()
                .force_new(),
        )
        .attribute(string("alias"))
        .attribute(created_string("group_status"))
        .attribute(created_string("create_time"))
}

pub fn api_group_schema() -> ResourceSchema {
    let position = || types::allowed_strings(&["header", "query", "path"]);
    ResourceSchema::new("tsf_api_group")
        .with_description("A TSF API group")
        .attribute(string("group_name").required())
        .attribute(
            string("group_context")
                .required()
                .with_description("Path prefix of the group, e.g. /api"),
        )
        .attribute(
            AttributeSchema::new("auth_type", types::allowed_strings(&["none", "secret"]))
                .computed()
                .optional(),
        )
        .attribute(string("description"))
        .attribute(
            AttributeSchema::new("group_type", types::allowed_strings(&["ms", "external"]))
                .computed()
                .optional()
                .force_new(),
        )
        .attribute(string("gateway_instance_id").computed().optional().force_new())
        .attribute(string("namespace_name_key"))
        .attribute(string("service_name_key"))
        .attribute(AttributeSchema::new("namespace_name_key_position", position()).computed().optional())
        .attribute(AttributeSchema::new("service_name_key_position", position()).computed().optional())
        .attribute(created_string("status"))
        .attribute(created_string("created_time"))
        .attribute(AttributeSchema::new("api_count", AttributeType::Int).computed())
}

/// Binding of an API group to a gateway deploy group
pub fn bind_api_group_schema() -> ResourceSchema {
    ResourceSchema::new("tsf_bind_api_group")
        .with_description("Binds a TSF API group to a gateway deploy group")
        .attribute(string("group_id").required().force_new())
        .attribute(string("gateway_deploy_group_id").required().force_new())
}

pub fn application_config_schema() -> ResourceSchema {
    ResourceSchema::new("tsf_application_config")
        .with_description("A versioned TSF application config")
        .attribute(string("config_name").required().force_new())
        .attribute(string("config_version").required().force_new())
        .attribute(string("config_value").required().force_new())
        .attribute(string("application_id").required().force_new())
        .attribute(string("config_version_desc").force_new())
        .attribute(string("config_type").computed().optional().force_new())
        .attribute(AttributeSchema::new("encode_with_base64", AttributeType::Bool).force_new().write_only())
        .attribute(created_string("creation_time"))
}

pub fn application_release_config_schema() -> ResourceSchema {
    ResourceSchema::new("tsf_application_release_config")
        .with_description("Release of an application config to a deploy group")
        .attribute(string("config_id").required().force_new())
        .attribute(string("group_id").required().force_new())
        .attribute(string("release_desc").force_new())
        .attribute(created_string("config_release_id"))
        .attribute(created_string("release_time"))
}

pub fn applications_schema() -> ResourceSchema {
    ResourceSchema::data_source("tsf_applications")
        .with_description("Query TSF applications")
        .attribute(AttributeSchema::new("application_type", types::allowed_strings(APPLICATION_TYPES)))
        .attribute(AttributeSchema::new("microservice_type", types::allowed_strings(MICROSERVICE_TYPES)))
        .attribute(string("search_word"))
        .attribute(result_list("result", "Matching applications"))
}
