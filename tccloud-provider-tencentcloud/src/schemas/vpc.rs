//! VPC schema definitions

use tccloud_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{result_list, string_list, tags_type};
use crate::services::vpc::ROUTE_NEXT_TYPES;

/// Returns the schema for VPC
pub fn vpc_schema() -> ResourceSchema {
    ResourceSchema::new("vpc")
        .with_description("A VPC (Virtual Private Cloud)")
        .attribute(
            AttributeSchema::new("name", types::string_length_in_range(1, 60))
                .required()
                .with_description("VPC name"),
        )
        .attribute(
            AttributeSchema::new("cidr_block", types::cidr())
                .required()
                .force_new()
                .with_description("The IPv4 network range for the VPC, in CIDR notation"),
        )
        .attribute(
            AttributeSchema::new("dns_servers", AttributeType::List(Box::new(types::ipv4())))
                .computed()
                .optional()
                .with_description("DNS servers of the VPC, at most 4"),
        )
        .attribute(AttributeSchema::new("is_multicast", AttributeType::Bool).with_default(true))
        .attribute(AttributeSchema::new("tags", tags_type()).computed().optional().force_new())
        .attribute(AttributeSchema::new("is_default", AttributeType::Bool).computed())
        .attribute(AttributeSchema::new("create_time", AttributeType::String).computed())
}

/// Returns the schema for Subnet
pub fn subnet_schema() -> ResourceSchema {
    ResourceSchema::new("subnet")
        .with_description("A VPC subnet")
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .force_new()
                .with_description("VPC to create the subnet in"),
        )
        .attribute(AttributeSchema::new("name", types::string_length_in_range(1, 60)).required())
        .attribute(
            AttributeSchema::new("cidr_block", types::cidr())
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("availability_zone", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("is_multicast", AttributeType::Bool).with_default(true))
        .attribute(
            AttributeSchema::new("route_table_id", AttributeType::String)
                .computed()
                .optional()
                .with_description("Route table associated with the subnet; the VPC default otherwise"),
        )
        .attribute(AttributeSchema::new("is_default", AttributeType::Bool).computed())
        .attribute(AttributeSchema::new("available_ip_count", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("create_time", AttributeType::String).computed())
}

/// Returns the schema for Route Table
pub fn route_table_schema() -> ResourceSchema {
    ResourceSchema::new("route_table")
        .with_description("A VPC route table")
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("name", types::string_length_in_range(1, 60)).required())
        .attribute(AttributeSchema::new("subnet_ids", string_list()).computed())
        .attribute(AttributeSchema::new("route_entry_ids", string_list()).computed())
        .attribute(AttributeSchema::new("is_default", AttributeType::Bool).computed())
        .attribute(AttributeSchema::new("create_time", AttributeType::String).computed())
}

/// Returns the schema for a route entry, managed through the legacy API
pub fn route_entry_schema() -> ResourceSchema {
    let next_types: Vec<&str> = ROUTE_NEXT_TYPES.iter().map(|(name, _)| *name).collect();
    ResourceSchema::new("route_entry")
        .with_description("One entry of a VPC route table")
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("route_table_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("cidr_block", types::cidr())
                .required()
                .force_new()
                .with_description("Destination of the route"),
        )
        .attribute(
            AttributeSchema::new("next_type", types::allowed_strings(&next_types))
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("next_hub", AttributeType::String)
                .required()
                .force_new()
                .with_description("Next hop: gateway id, or an IP address when next_type is instance"),
        )
}

/// Returns the schema for Security Group
pub fn security_group_schema() -> ResourceSchema {
    ResourceSchema::new("security_group")
        .with_description("A security group")
        .attribute(AttributeSchema::new("name", types::string_length_in_range(1, 60)).required())
        .attribute(AttributeSchema::new("description", types::string_length_in_range(1, 100)))
        .attribute(AttributeSchema::new("project_id", AttributeType::Int).computed().optional().force_new())
        .attribute(AttributeSchema::new("tags", tags_type()).computed().optional().force_new())
        .attribute(AttributeSchema::new("create_time", AttributeType::String).computed())
}

pub fn vpc_instances_schema() -> ResourceSchema {
    ResourceSchema::data_source("vpc_instances")
        .with_description("Query VPCs")
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String))
        .attribute(AttributeSchema::new("name", AttributeType::String))
        .attribute(AttributeSchema::new("is_default", AttributeType::Bool))
        .attribute(AttributeSchema::new("tag_key", AttributeType::String))
        .attribute(AttributeSchema::new("cidr_block", types::cidr()))
        .attribute(result_list("instance_list", "Matching VPCs"))
}

pub fn vpc_subnets_schema() -> ResourceSchema {
    ResourceSchema::data_source("vpc_subnets")
        .with_description("Query subnets")
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String))
        .attribute(AttributeSchema::new("subnet_id", AttributeType::String))
        .attribute(AttributeSchema::new("name", AttributeType::String))
        .attribute(AttributeSchema::new("availability_zone", AttributeType::String))
        .attribute(AttributeSchema::new("is_default", AttributeType::Bool))
        .attribute(AttributeSchema::new("cidr_block", types::cidr()))
        .attribute(result_list("instance_list", "Matching subnets"))
}

pub fn vpc_route_tables_schema() -> ResourceSchema {
    ResourceSchema::data_source("vpc_route_tables")
        .with_description("Query route tables")
        .attribute(AttributeSchema::new("route_table_id", AttributeType::String))
        .attribute(AttributeSchema::new("name", AttributeType::String))
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String))
        .attribute(AttributeSchema::new("association_main", AttributeType::Bool))
        .attribute(result_list("instance_list", "Matching route tables"))
}

pub fn security_groups_schema() -> ResourceSchema {
    ResourceSchema::data_source("security_groups")
        .with_description("Query security groups")
        .attribute(AttributeSchema::new("security_group_id", AttributeType::String))
        .attribute(AttributeSchema::new("name", AttributeType::String))
        .attribute(AttributeSchema::new("project_id", AttributeType::Int))
        .attribute(result_list("security_groups", "Matching security groups"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tccloud_core::resource::Value;

    #[test]
    fn test_vpc_cidr_validation() {
        let schema = vpc_schema();
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from("main"));
        attrs.insert("cidr_block".to_string(), Value::from("10.0.0.0/16"));
        assert!(schema.validate(&attrs).is_ok());

        attrs.insert("cidr_block".to_string(), Value::from("10.0.0.0/33"));
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn test_route_entry_next_types() {
        let schema = route_entry_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vpc_id".to_string(), Value::from("vpc-1"));
        attrs.insert("route_table_id".to_string(), Value::from("rtb-1"));
        attrs.insert("cidr_block".to_string(), Value::from("10.1.0.0/24"));
        attrs.insert("next_type".to_string(), Value::from("nat_gateway"));
        attrs.insert("next_hub".to_string(), Value::from("nat-1"));
        assert!(schema.validate(&attrs).is_ok());

        attrs.insert("next_type".to_string(), Value::from("internet"));
        assert!(schema.validate(&attrs).is_err());
    }
}
