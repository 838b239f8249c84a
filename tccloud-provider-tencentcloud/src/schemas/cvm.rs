//! CVM schema definitions

use tccloud_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{filters_attribute, result_list, string_list, tags_type};

pub const INSTANCE_CHARGE_TYPES: &[&str] = &["POSTPAID_BY_HOUR", "PREPAID", "SPOTPAID"];

pub const SYSTEM_DISK_TYPES: &[&str] = &[
    "LOCAL_BASIC",
    "LOCAL_SSD",
    "CLOUD_BASIC",
    "CLOUD_SSD",
    "CLOUD_PREMIUM",
];

pub const DEFAULT_INSTANCE_NAME: &str = "tccloud-instance";

/// Returns the schema for a CVM instance
pub fn instance_schema() -> ResourceSchema {
    ResourceSchema::new("instance")
        .with_description("A CVM compute instance")
        .attribute(
            AttributeSchema::new("image_id", AttributeType::String)
                .required()
                .force_new()
                .with_description("Image to boot from"),
        )
        .attribute(
            AttributeSchema::new("availability_zone", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("instance_type", AttributeType::String)
                .required()
                .with_description("Instance type, e.g. S5.SMALL2. Changing it resets the instance type"),
        )
        .attribute(
            AttributeSchema::new("instance_name", types::string_length_in_range(2, 60))
                .with_default(DEFAULT_INSTANCE_NAME),
        )
        .attribute(
            AttributeSchema::new("instance_charge_type", types::allowed_strings(INSTANCE_CHARGE_TYPES))
                .force_new()
                .with_default("POSTPAID_BY_HOUR"),
        )
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).computed().optional().force_new())
        .attribute(AttributeSchema::new("subnet_id", AttributeType::String).computed().optional().force_new())
        .attribute(
            AttributeSchema::new("security_groups", string_list())
                .computed()
                .optional()
                .with_description("Security group ids"),
        )
        .attribute(
            AttributeSchema::new("system_disk_type", types::allowed_strings(SYSTEM_DISK_TYPES))
                .computed()
                .optional()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("system_disk_size", types::int_in_range(50, 1000))
                .computed()
                .optional()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("internet_max_bandwidth_out", types::int_in_range(0, 100))
                .computed()
                .optional()
                .force_new()
                .with_description("Public bandwidth cap in Mbps"),
        )
        .attribute(
            AttributeSchema::new("allocate_public_ip", AttributeType::Bool)
                .computed()
                .optional()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("password", AttributeType::String)
                .sensitive()
                .write_only()
                .with_description("Login password; changing it force-stops the instance"),
        )
        .attribute(AttributeSchema::new("hostname", AttributeType::String).force_new().write_only())
        .attribute(AttributeSchema::new("project_id", AttributeType::Int).with_default(0i64))
        .attribute(
            AttributeSchema::new("running_flag", AttributeType::Bool)
                .with_default(true)
                .with_description("Keep the instance running (true) or stopped (false)"),
        )
        .attribute(AttributeSchema::new("tags", tags_type()).computed().optional().force_new())
        .attribute(AttributeSchema::new("instance_status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("private_ip", AttributeType::String).computed())
        .attribute(AttributeSchema::new("public_ip", AttributeType::String).computed())
        .attribute(AttributeSchema::new("create_time", AttributeType::String).computed())
        .attribute(AttributeSchema::new("expired_time", AttributeType::String).computed())
}

pub fn instances_schema() -> ResourceSchema {
    ResourceSchema::data_source("instances")
        .with_description("Query CVM instances")
        .attribute(AttributeSchema::new("instance_id", AttributeType::String))
        .attribute(AttributeSchema::new("instance_name", AttributeType::String))
        .attribute(AttributeSchema::new("availability_zone", AttributeType::String))
        .attribute(AttributeSchema::new("project_id", AttributeType::Int))
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String))
        .attribute(AttributeSchema::new("subnet_id", AttributeType::String))
        .attribute(filters_attribute())
        .attribute(result_list("instance_list", "Matching instances"))
}

pub fn instance_types_schema() -> ResourceSchema {
    ResourceSchema::data_source("instance_types")
        .with_description("Query the instance types on sale")
        .attribute(AttributeSchema::new("availability_zone", AttributeType::String))
        .attribute(AttributeSchema::new("cpu_core_count", types::positive_int()))
        .attribute(AttributeSchema::new("memory_size", types::positive_int()))
        .attribute(filters_attribute())
        .attribute(result_list("instance_types", "Matching instance type configurations"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tccloud_core::resource::Value;

    #[test]
    fn test_instance_defaults() {
        let schema = instance_schema();
        let mut attrs = HashMap::new();
        attrs.insert("image_id".to_string(), Value::from("img-1"));
        attrs.insert("availability_zone".to_string(), Value::from("ap-guangzhou-3"));
        attrs.insert("instance_type".to_string(), Value::from("S5.SMALL2"));
        assert!(schema.validate(&attrs).is_ok());

        schema.apply_defaults(&mut attrs);
        assert_eq!(attrs.get("instance_name"), Some(&Value::from(DEFAULT_INSTANCE_NAME)));
        assert_eq!(attrs.get("instance_charge_type"), Some(&Value::from("POSTPAID_BY_HOUR")));
        assert_eq!(attrs.get("running_flag"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_image_change_requires_replacement() {
        let schema = instance_schema();
        let mut prior = HashMap::new();
        prior.insert("image_id".to_string(), Value::from("img-1"));
        prior.insert("instance_type".to_string(), Value::from("S5.SMALL2"));
        schema.apply_defaults(&mut prior);
        let mut desired = prior.clone();
        desired.insert("instance_type".to_string(), Value::from("S5.MEDIUM4"));
        assert!(schema.replacement_attributes(&prior, &desired).is_empty());

        desired.insert("image_id".to_string(), Value::from("img-2"));
        assert_eq!(schema.replacement_attributes(&prior, &desired), vec!["image_id"]);
    }
}
