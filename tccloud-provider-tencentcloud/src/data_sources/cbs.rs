use serde_json::json;
use tccloud_core::provider::ProviderResult;
use tccloud_core::resource::Resource;

use super::{Filters, QueryResult};
use crate::TencentCloudProvider;
use crate::services::{read_retry, tags_to_map};

impl TencentCloudProvider {
    pub(super) async fn query_cbs_storages(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let filters = Filters::new(resource)
            .attribute("storage_id", "disk-id")
            .attribute("storage_name", "disk-name")
            .attribute("availability_zone", "zone")
            .attribute("project_id", "project-id")
            .attribute("storage_type", "disk-type")
            .attribute("storage_usage", "disk-usage")
            .build()?;

        let filters = &filters;
        let disks = read_retry(|| async move { self.cbs().describe_disks(filters).await }).await?;

        let mut result = QueryResult::new("storage_list");
        for disk in disks {
            let row = json!({
                "storage_id": disk.disk_id,
                "storage_name": disk.disk_name,
                "storage_type": disk.disk_type,
                "storage_size": disk.disk_size,
                "storage_usage": disk.disk_usage,
                "storage_status": disk.disk_state,
                "availability_zone": disk.placement.zone,
                "project_id": disk.placement.project_id.unwrap_or(0),
                "attached": disk.attached,
                "instance_id": disk.instance_id,
                "encrypt": disk.encrypt,
                "throughput_performance": disk.throughput_performance,
                "charge_type": disk.disk_charge_type,
                "prepaid_renew_flag": disk.renew_flag,
                "create_time": disk.create_time,
                "tags": tags_to_map(&disk.tags),
            });
            result.push(disk.disk_id.clone(), row);
        }
        Ok(result)
    }

    pub(super) async fn query_cbs_snapshots(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let filters = Filters::new(resource)
            .attribute("snapshot_id", "snapshot-id")
            .attribute("snapshot_name", "snapshot-name")
            .attribute("storage_id", "disk-id")
            .attribute("availability_zone", "zone")
            .attribute("project_id", "project-id")
            .build()?;

        let filters = &filters;
        let snapshots =
            read_retry(|| async move { self.cbs().describe_snapshots(filters).await }).await?;

        let mut result = QueryResult::new("snapshot_list");
        for snapshot in snapshots {
            let row = json!({
                "snapshot_id": snapshot.snapshot_id,
                "snapshot_name": snapshot.snapshot_name,
                "snapshot_status": snapshot.snapshot_state,
                "storage_id": snapshot.disk_id,
                "storage_size": snapshot.disk_size,
                "storage_usage": snapshot.disk_usage,
                "availability_zone": snapshot.placement.zone,
                "project_id": snapshot.placement.project_id.unwrap_or(0),
                "percent": snapshot.percent,
                "encrypt": snapshot.encrypt,
                "create_time": snapshot.create_time,
            });
            result.push(snapshot.snapshot_id.clone(), row);
        }
        Ok(result)
    }
}
