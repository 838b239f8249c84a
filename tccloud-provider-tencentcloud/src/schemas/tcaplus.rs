//! TcaplusDB schema definitions

use tccloud_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::result_list;

pub const IDL_TYPES: &[&str] = &["PROTO", "TDR", "MIX"];
pub const TABLE_TYPES: &[&str] = &["GENERIC", "LIST"];
pub const TABLE_IDL_TYPES: &[&str] = &["PROTO", "TDR"];

pub fn application_schema() -> ResourceSchema {
    ResourceSchema::new("tcaplus_application")
        .with_description("A TcaplusDB application (cluster)")
        .attribute(
            AttributeSchema::new("idl_type", types::allowed_strings(IDL_TYPES))
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("app_name", types::string_length_in_range(1, 30)).required())
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("subnet_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("password", AttributeType::String)
                .required()
                .sensitive()
                .write_only()
                .with_description("Access password. Changing it keeps the old one valid for old_password_expire_last seconds"),
        )
        .attribute(
            AttributeSchema::new("old_password_expire_last", types::positive_int())
                .with_default(3600i64)
                .write_only(),
        )
        .attribute(AttributeSchema::new("network_type", AttributeType::String).computed())
        .attribute(AttributeSchema::new("create_time", AttributeType::String).computed())
        .attribute(AttributeSchema::new("password_status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("api_access_id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("api_access_ip", AttributeType::String).computed())
        .attribute(AttributeSchema::new("api_access_port", AttributeType::Int).computed())
}

pub fn zone_schema() -> ResourceSchema {
    ResourceSchema::new("tcaplus_zone")
        .with_description("A TcaplusDB zone (table group)")
        .attribute(
            AttributeSchema::new("app_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("zone_name", types::string_length_in_range(1, 30)).required())
        .attribute(AttributeSchema::new("table_count", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("total_size", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("create_time", AttributeType::String).computed())
}

pub fn idl_schema() -> ResourceSchema {
    ResourceSchema::new("tcaplus_idl")
        .with_description("A TcaplusDB IDL file describing table layouts")
        .attribute(
            AttributeSchema::new("app_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("zone_id", AttributeType::String)
                .required()
                .force_new()
                .write_only()
                .with_description("Zone id as returned by tcaplus_zone (<app_id>:<zone>)"),
        )
        .attribute(
            AttributeSchema::new("file_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("file_type", types::allowed_strings(&["PROTO", "TDR"]))
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("file_ext_type", types::allowed_strings(&["proto", "xml"]))
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("file_content", AttributeType::String)
                .required()
                .force_new()
                .write_only(),
        )
        .attribute(result_list("table_infos", "Tables parsed from the file"))
}

pub fn table_schema() -> ResourceSchema {
    ResourceSchema::new("tcaplus_table")
        .with_description("A TcaplusDB table")
        .attribute(
            AttributeSchema::new("app_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("zone_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("table_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("table_type", types::allowed_strings(TABLE_TYPES))
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(
            AttributeSchema::new("idl_id", AttributeType::String)
                .required()
                .with_description("Id of the tcaplus_idl defining the table; changing it alters the table"),
        )
        .attribute(
            AttributeSchema::new("table_idl_type", types::allowed_strings(TABLE_IDL_TYPES))
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("reserved_read_qps", AttributeType::Int)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("reserved_write_qps", AttributeType::Int)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("reserved_volume", AttributeType::Int)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("table_size", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("create_time", AttributeType::String).computed())
        .attribute(AttributeSchema::new("error", AttributeType::String).computed())
}

pub fn applications_schema() -> ResourceSchema {
    ResourceSchema::data_source("tcaplus_applications")
        .with_description("Query TcaplusDB applications")
        .attribute(AttributeSchema::new("app_id", AttributeType::String))
        .attribute(AttributeSchema::new("app_name", AttributeType::String))
        .attribute(result_list("list", "Matching applications"))
}

pub fn zones_schema() -> ResourceSchema {
    ResourceSchema::data_source("tcaplus_zones")
        .with_description("Query the zones of a TcaplusDB application")
        .attribute(AttributeSchema::new("app_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("zone_id", AttributeType::String))
        .attribute(AttributeSchema::new("zone_name", AttributeType::String))
        .attribute(result_list("list", "Matching zones"))
}

pub fn tables_schema() -> ResourceSchema {
    ResourceSchema::data_source("tcaplus_tables")
        .with_description("Query the tables of a TcaplusDB application")
        .attribute(AttributeSchema::new("app_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("zone_id", AttributeType::String))
        .attribute(AttributeSchema::new("table_id", AttributeType::String))
        .attribute(AttributeSchema::new("table_name", AttributeType::String))
        .attribute(result_list("list", "Matching tables"))
}

pub fn idls_schema() -> ResourceSchema {
    ResourceSchema::data_source("tcaplus_idls")
        .with_description("Query the IDL files of a TcaplusDB application")
        .attribute(AttributeSchema::new("app_id", AttributeType::String).required())
        .attribute(result_list("list", "IDL files"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tccloud_core::resource::Value;

    #[test]
    fn test_password_is_sensitive() {
        let schema = application_schema();
        let mut attrs = HashMap::new();
        attrs.insert("password".to_string(), Value::from("secret"));
        let redacted = schema.redact(&attrs);
        assert_eq!(redacted.get("password"), Some(&Value::from("(sensitive)")));
    }

    #[test]
    fn test_idl_change_is_in_place() {
        let schema = table_schema();
        assert!(!schema.attributes["idl_id"].force_new);
        assert!(schema.attributes["table_name"].force_new);
    }

    #[test]
    fn test_zones_require_app_id() {
        let errors = zones_schema().validate(&HashMap::new()).unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
