use serde_json::json;
use tccloud_core::provider::ProviderResult;
use tccloud_core::resource::Resource;

use super::{Filters, QueryResult};
use crate::TencentCloudProvider;
use crate::services::{read_retry, tags_to_map};

impl TencentCloudProvider {
    pub(super) async fn query_vpc_instances(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let filters = Filters::new(resource)
            .attribute("vpc_id", "vpc-id")
            .attribute("name", "vpc-name")
            .attribute("is_default", "is-default")
            .attribute("tag_key", "tag-key")
            .attribute("cidr_block", "cidr-block")
            .build()?;

        let filters = &filters;
        let vpcs = read_retry(|| async move { self.vpc().describe_vpcs(filters).await }).await?;

        let mut result = QueryResult::new("instance_list");
        for vpc in vpcs {
            let row = json!({
                "vpc_id": vpc.vpc_id,
                "name": vpc.vpc_name,
                "cidr_block": vpc.cidr_block,
                "is_default": vpc.is_default,
                "is_multicast": vpc.enable_multicast,
                "dns_servers": vpc.dns_server_set,
                "create_time": vpc.created_time,
                "tags": tags_to_map(&vpc.tag_set),
            });
            result.push(vpc.vpc_id.clone(), row);
        }
        Ok(result)
    }

    pub(super) async fn query_vpc_subnets(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let filters = Filters::new(resource)
            .attribute("vpc_id", "vpc-id")
            .attribute("subnet_id", "subnet-id")
            .attribute("name", "subnet-name")
            .attribute("availability_zone", "zone")
            .attribute("is_default", "is-default")
            .attribute("cidr_block", "cidr-block")
            .build()?;

        let filters = &filters;
        let subnets = read_retry(|| async move { self.vpc().describe_subnets(filters).await }).await?;

        let mut result = QueryResult::new("instance_list");
        for subnet in subnets {
            let row = json!({
                "vpc_id": subnet.vpc_id,
                "subnet_id": subnet.subnet_id,
                "name": subnet.subnet_name,
                "cidr_block": subnet.cidr_block,
                "availability_zone": subnet.zone,
                "is_default": subnet.is_default,
                "is_multicast": subnet.enable_broadcast,
                "route_table_id": subnet.route_table_id,
                "available_ip_count": subnet.available_ip_address_count,
                "create_time": subnet.created_time,
            });
            result.push(subnet.subnet_id.clone(), row);
        }
        Ok(result)
    }

    pub(super) async fn query_vpc_route_tables(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let filters = Filters::new(resource)
            .attribute("route_table_id", "route-table-id")
            .attribute("name", "route-table-name")
            .attribute("vpc_id", "vpc-id")
            .attribute("association_main", "association.main")
            .build()?;

        let filters = &filters;
        let tables =
            read_retry(|| async move { self.vpc().describe_route_tables(filters).await }).await?;

        let mut result = QueryResult::new("instance_list");
        for table in tables {
            let subnet_ids: Vec<&str> = table
                .association_set
                .iter()
                .map(|a| a.subnet_id.as_str())
                .collect();
            let routes: Vec<serde_json::Value> = table
                .route_set
                .iter()
                .map(|r| {
                    json!({
                        "route_entry_id": r.route_id.to_string(),
                        "destination_cidr_block": r.destination_cidr_block,
                        "next_type": r.gateway_type,
                        "next_hub": r.gateway_id,
                        "description": r.route_description,
                    })
                })
                .collect();
            let row = json!({
                "route_table_id": table.route_table_id,
                "name": table.route_table_name,
                "vpc_id": table.vpc_id,
                "is_default": table.main,
                "subnet_ids": subnet_ids,
                "route_entry_infos": routes,
                "create_time": table.created_time,
            });
            result.push(table.route_table_id.clone(), row);
        }
        Ok(result)
    }

    pub(super) async fn query_security_groups(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let filters = Filters::new(resource)
            .attribute("security_group_id", "security-group-id")
            .attribute("name", "security-group-name")
            .attribute("project_id", "project-id")
            .build()?;

        let filters = &filters;
        let groups =
            read_retry(|| async move { self.vpc().describe_security_groups(filters).await }).await?;

        let mut result = QueryResult::new("security_groups");
        for group in groups {
            let row = json!({
                "security_group_id": group.security_group_id,
                "name": group.security_group_name,
                "description": group.security_group_desc,
                "project_id": group.project_id.parse::<i64>().unwrap_or(0),
                "is_default": group.is_default,
                "create_time": group.created_time,
                "tags": tags_to_map(&group.tag_set),
            });
            result.push(group.security_group_id.clone(), row);
        }
        Ok(result)
    }
}
