//! CBS schema definitions

use tccloud_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{result_list, tags_type};

pub const STORAGE_TYPES: &[&str] = &["CLOUD_BASIC", "CLOUD_PREMIUM", "CLOUD_SSD", "CLOUD_HSSD", "CLOUD_TSSD"];

pub const CHARGE_TYPES: &[&str] = &["POSTPAID_BY_HOUR", "PREPAID"];

pub const RENEW_FLAGS: &[&str] = &[
    "NOTIFY_AND_AUTO_RENEW",
    "NOTIFY_AND_MANUAL_RENEW",
    "DISABLE_NOTIFY_AND_MANUAL_RENEW",
];

/// Returns the schema for a cloud disk
pub fn storage_schema() -> ResourceSchema {
    ResourceSchema::new("cbs_storage")
        .with_description("A CBS cloud block storage disk")
        .attribute(
            AttributeSchema::new("storage_type", types::allowed_strings(STORAGE_TYPES))
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("storage_size", types::int_in_range(10, 32000))
                .required()
                .with_description("Size in GB. Disks can only grow"),
        )
        .attribute(
            AttributeSchema::new("availability_zone", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("storage_name", types::string_length_in_range(2, 60)).required())
        .attribute(
            AttributeSchema::new("charge_type", types::allowed_strings(CHARGE_TYPES))
                .force_new()
                .with_default("POSTPAID_BY_HOUR"),
        )
        .attribute(
            AttributeSchema::new("prepaid_period", types::allowed_ints(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 24, 36]))
                .write_only()
                .with_description("Months purchased when charge_type is PREPAID"),
        )
        .attribute(
            AttributeSchema::new("prepaid_renew_flag", types::allowed_strings(RENEW_FLAGS))
                .computed()
                .optional(),
        )
        .attribute(
            AttributeSchema::new("snapshot_id", AttributeType::String)
                .computed()
                .optional()
                .write_only()
                .with_description("Snapshot to create from; changing it rolls the disk back"),
        )
        .attribute(AttributeSchema::new("project_id", AttributeType::Int).with_default(0i64))
        .attribute(AttributeSchema::new("encrypt", AttributeType::Bool).computed().optional().force_new())
        .attribute(
            AttributeSchema::new("throughput_performance", AttributeType::Int)
                .computed()
                .optional()
                .with_description("Extra throughput in MB/s"),
        )
        .attribute(
            AttributeSchema::new("force_delete", AttributeType::Bool)
                .with_default(false)
                .write_only()
                .with_description("Also remove the disk from the recycle bin on delete"),
        )
        .attribute(AttributeSchema::new("tags", tags_type()).computed().optional().force_new())
        .attribute(AttributeSchema::new("storage_status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("attached", AttributeType::Bool).computed())
}

/// Returns the schema for attaching a disk to an instance
pub fn storage_attachment_schema() -> ResourceSchema {
    ResourceSchema::new("cbs_storage_attachment")
        .with_description("Attachment of a CBS disk to a CVM instance")
        .attribute(
            AttributeSchema::new("storage_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("instance_id", AttributeType::String)
                .required()
                .force_new(),
        )
}

pub fn snapshot_schema() -> ResourceSchema {
    ResourceSchema::new("cbs_snapshot")
        .with_description("A snapshot of a CBS disk")
        .attribute(
            AttributeSchema::new("storage_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("snapshot_name", types::string_length_in_range(2, 60)).required())
        .attribute(AttributeSchema::new("snapshot_status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("storage_size", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("create_time", AttributeType::String).computed())
        .attribute(AttributeSchema::new("percent", AttributeType::Int).computed())
}

pub fn storages_schema() -> ResourceSchema {
    ResourceSchema::data_source("cbs_storages")
        .with_description("Query CBS disks")
        .attribute(AttributeSchema::new("storage_id", AttributeType::String))
        .attribute(AttributeSchema::new("storage_name", AttributeType::String))
        .attribute(AttributeSchema::new("availability_zone", AttributeType::String))
        .attribute(AttributeSchema::new("project_id", AttributeType::Int))
        .attribute(AttributeSchema::new("storage_type", types::allowed_strings(STORAGE_TYPES)))
        .attribute(AttributeSchema::new(
            "storage_usage",
            types::allowed_strings(&["SYSTEM_DISK", "DATA_DISK"]),
        ))
        .attribute(result_list("storage_list", "Matching disks"))
}

pub fn snapshots_schema() -> ResourceSchema {
    ResourceSchema::data_source("cbs_snapshots")
        .with_description("Query CBS snapshots")
        .attribute(AttributeSchema::new("snapshot_id", AttributeType::String))
        .attribute(AttributeSchema::new("snapshot_name", AttributeType::String))
        .attribute(AttributeSchema::new("storage_id", AttributeType::String))
        .attribute(AttributeSchema::new("availability_zone", AttributeType::String))
        .attribute(AttributeSchema::new("project_id", AttributeType::Int))
        .attribute(result_list("snapshot_list", "Matching snapshots"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tccloud_core::resource::Value;
    use tccloud_core::schema::TypeError;

    fn storage_attrs() -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert("storage_type".to_string(), Value::from("CLOUD_SSD"));
        attrs.insert("storage_size".to_string(), Value::Int(100));
        attrs.insert("availability_zone".to_string(), Value::from("ap-guangzhou-3"));
        attrs.insert("storage_name".to_string(), Value::from("data"));
        attrs
    }

    #[test]
    fn test_storage_size_bounds() {
        let schema = storage_schema();
        assert!(schema.validate(&storage_attrs()).is_ok());

        let mut attrs = storage_attrs();
        attrs.insert("storage_size".to_string(), Value::Int(5));
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(&errors[0], TypeError::InvalidAttribute { name, .. } if name == "storage_size"));
    }

    #[test]
    fn test_storage_status_is_computed_only() {
        let mut attrs = storage_attrs();
        attrs.insert("storage_status".to_string(), Value::from("ATTACHED"));
        let errors = storage_schema().validate(&attrs).unwrap_err();
        assert!(matches!(&errors[0], TypeError::ComputedOnly { name } if name == "storage_status"));
    }

    #[test]
    fn test_resize_is_in_place() {
        let schema = storage_schema();
        let mut prior = storage_attrs();
        schema.apply_defaults(&mut prior);
        let mut desired = prior.clone();
        desired.insert("storage_size".to_string(), Value::Int(200));
        assert!(schema.replacement_attributes(&prior, &desired).is_empty());

        desired.insert("storage_type".to_string(), Value::from("CLOUD_PREMIUM"));
        assert_eq!(schema.replacement_attributes(&prior, &desired), vec!["storage_type"]);
    }
}
