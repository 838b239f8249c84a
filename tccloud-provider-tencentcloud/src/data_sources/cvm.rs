use serde_json::json;
use tccloud_core::provider::ProviderResult;
use tccloud_core::resource::{AttributesExt, Resource};

use super::{Filters, QueryResult, input};
use crate::TencentCloudProvider;
use crate::services::{read_retry, tags_to_map};

impl TencentCloudProvider {
    pub(super) async fn query_instances(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let instance_ids: Vec<String> = input(resource, "instance_id").map(String::from).into_iter().collect();
        let filters = Filters::new(resource)
            .attribute("instance_name", "instance-name")
            .attribute("availability_zone", "zone")
            .attribute("project_id", "project-id")
            .attribute("vpc_id", "vpc-id")
            .attribute("subnet_id", "subnet-id")
            .generic()
            .build()?;

        let (ids, filters) = (&instance_ids, &filters);
        let instances =
            read_retry(|| async move { self.cvm().describe_instances(ids, filters).await }).await?;

        let mut result = QueryResult::new("instance_list");
        for instance in instances {
            let row = json!({
                "instance_id": instance.instance_id,
                "instance_name": instance.instance_name,
                "instance_type": instance.instance_type,
                "cpu": instance.cpu,
                "memory": instance.memory,
                "availability_zone": instance.placement.zone,
                "project_id": instance.placement.project_id.unwrap_or(0),
                "image_id": instance.image_id,
                "instance_charge_type": instance.instance_charge_type,
                "vpc_id": instance.virtual_private_cloud.vpc_id,
                "subnet_id": instance.virtual_private_cloud.subnet_id,
                "security_groups": instance.security_group_ids,
                "private_ip": instance.private_ip_addresses.first(),
                "public_ip": instance.public_ip_addresses.first(),
                "system_disk_type": instance.system_disk.disk_type,
                "system_disk_size": instance.system_disk.disk_size,
                "internet_max_bandwidth_out": instance.internet_accessible.internet_max_bandwidth_out,
                "status": instance.instance_state,
                "create_time": instance.created_time,
                "expired_time": instance.expired_time,
                "tags": tags_to_map(&instance.tags),
            });
            result.push(instance.instance_id.clone(), row);
        }
        Ok(result)
    }

    /// CPU and memory are matched locally; the legacy API filters by zone and family only
    pub(super) async fn query_instance_types(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let filters = Filters::new(resource)
            .attribute("availability_zone", "zone")
            .generic()
            .build()?;
        let cpu = resource.attributes.int("cpu_core_count");
        let memory = resource.attributes.int("memory_size");

        let filters = &filters;
        let configs =
            read_retry(|| async move { self.cvm().describe_instance_types(filters).await }).await?;

        let mut result = QueryResult::new("instance_types");
        for config in configs {
            if cpu.is_some_and(|c| c != config.cpu) || memory.is_some_and(|m| m != config.memory) {
                continue;
            }
            let row = json!({
                "availability_zone": config.zone,
                "instance_type": config.instance_type,
                "family": config.instance_family,
                "cpu_core_count": config.cpu,
                "memory_size": config.memory,
                "gpu_core_count": config.gpu,
                "fpga_core_count": config.fpga,
            });
            result.push(config.instance_type.clone(), row);
        }
        Ok(result)
    }
}
