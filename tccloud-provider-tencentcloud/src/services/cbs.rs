//! Cloud block storage: disks, attachments and snapshots

use serde::{Deserialize, Serialize};

use super::{Ack, Tag, paginate};
use crate::connectivity::TencentCloudClient;
use crate::error::ApiError;
use crate::helper::Filter;

const SERVICE: &str = "cbs";
const VERSION: &str = "2017-03-12";
pub const PAGE_LIMIT: u64 = 100;

pub const DISK_STATE_UNATTACHED: &str = "UNATTACHED";
pub const DISK_STATE_ATTACHED: &str = "ATTACHED";
pub const DISK_STATE_EXPANDING: &str = "EXPANDING";
pub const DISK_STATE_ROLLBACKING: &str = "ROLLBACKING";
pub const DISK_STATE_TORECYCLE: &str = "TORECYCLE";
/// Transitional states reported while a new disk is being set up
pub const DISK_PENDING_STATES: &[&str] = &["PENDING", "CREATING", "ATTACHING", "DETACHING"];

pub const SNAPSHOT_STATE_NORMAL: &str = "NORMAL";
pub const SNAPSHOT_STATE_FAILED: &str = "FAILED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Placement {
    pub zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Disk {
    pub disk_id: String,
    pub disk_name: String,
    pub disk_type: String,
    pub disk_size: i64,
    pub disk_state: String,
    pub disk_usage: String,
    pub disk_charge_type: String,
    pub attached: bool,
    pub instance_id: String,
    pub placement: Placement,
    pub encrypt: bool,
    pub throughput_performance: i64,
    pub renew_flag: String,
    pub create_time: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Snapshot {
    pub snapshot_id: String,
    pub snapshot_name: String,
    pub snapshot_state: String,
    pub disk_id: String,
    pub disk_size: i64,
    pub disk_usage: String,
    pub placement: Placement,
    pub percent: i64,
    pub create_time: String,
    pub encrypt: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiskChargePrepaid {
    pub period: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renew_flag: Option<String>,
}

/// Arguments of `CreateDisks` for a single disk
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateDiskRequest {
    pub placement: Placement,
    pub disk_charge_type: String,
    pub disk_type: String,
    pub disk_name: String,
    pub disk_size: i64,
    pub disk_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_charge_prepaid: Option<DiskChargePrepaid>,
    /// "ENCRYPT" when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_performance: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    disk_ids: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_ids: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "<[Filter]>::is_empty")]
    filters: &'a [Filter],
    offset: u64,
    limit: u64,
}

impl<'a> DescribeRequest<'a> {
    fn page(filters: &'a [Filter], offset: u64, limit: u64) -> Self {
        Self {
            disk_ids: None,
            snapshot_ids: None,
            filters,
            offset,
            limit,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDisksResponse {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    disk_set: Vec<Disk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSnapshotsResponse {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    snapshot_set: Vec<Snapshot>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DiskIdsRequest<'a> {
    disk_ids: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_id: Option<&'a str>,
}

pub struct CbsService<'a> {
    client: &'a TencentCloudClient,
}

impl<'a> CbsService<'a> {
    pub fn new(client: &'a TencentCloudClient) -> Self {
        Self { client }
    }

    // ---- Disks ----

    pub async fn create_disk(&self, req: &CreateDiskRequest) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            disk_id_set: Vec<String>,
        }
        let resp: Resp = self.client.call(SERVICE, VERSION, "CreateDisks", req).await?;
        resp.disk_id_set
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::EmptyResponse("CreateDisks".to_string()))
    }

    pub async fn describe_disk(&self, disk_id: &str) -> Result<Option<Disk>, ApiError> {
        let mut req = DescribeRequest::page(&[], 0, PAGE_LIMIT);
        req.disk_ids = Some(vec![disk_id]);
        let resp: DescribeDisksResponse =
            self.client.call(SERVICE, VERSION, "DescribeDisks", &req).await?;
        Ok(resp.disk_set.into_iter().find(|d| d.disk_id == disk_id))
    }

    pub async fn describe_disks(&self, filters: &[Filter]) -> Result<Vec<Disk>, ApiError> {
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = DescribeRequest::page(filters, offset, limit);
            let resp: DescribeDisksResponse =
                self.client.call(SERVICE, VERSION, "DescribeDisks", &req).await?;
            Ok((resp.disk_set, resp.total_count))
        })
        .await
    }

    pub async fn modify_disk_attributes(
        &self,
        disk_id: &str,
        disk_name: Option<&str>,
        project_id: Option<i64>,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            disk_ids: Vec<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            disk_name: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            project_id: Option<i64>,
        }
        let req = Req {
            disk_ids: vec![disk_id],
            disk_name,
            project_id,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyDiskAttributes", &req)
            .await?;
        Ok(())
    }

    pub async fn resize_disk(&self, disk_id: &str, disk_size: i64) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            disk_id: &'a str,
            disk_size: i64,
        }
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ResizeDisk", &Req { disk_id, disk_size })
            .await?;
        Ok(())
    }

    pub async fn apply_snapshot(&self, disk_id: &str, snapshot_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            disk_id: &'a str,
            snapshot_id: &'a str,
        }
        let req = Req {
            disk_id,
            snapshot_id,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ApplySnapshot", &req)
            .await?;
        Ok(())
    }

    pub async fn modify_throughput_performance(
        &self,
        disk_id: &str,
        throughput_performance: i64,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            disk_id: &'a str,
            throughput_performance: i64,
        }
        let req = Req {
            disk_id,
            throughput_performance,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyDiskExtraPerformance", &req)
            .await?;
        Ok(())
    }

    pub async fn terminate_disk(&self, disk_id: &str) -> Result<(), ApiError> {
        let req = DiskIdsRequest {
            disk_ids: vec![disk_id],
            instance_id: None,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "TerminateDisks", &req)
            .await?;
        Ok(())
    }

    // ---- Attachments ----

    pub async fn attach_disk(&self, disk_id: &str, instance_id: &str) -> Result<(), ApiError> {
        let req = DiskIdsRequest {
            disk_ids: vec![disk_id],
            instance_id: Some(instance_id),
        };
        let _: Ack = self.client.call(SERVICE, VERSION, "AttachDisks", &req).await?;
        Ok(())
    }

    pub async fn detach_disk(&self, disk_id: &str, instance_id: &str) -> Result<(), ApiError> {
        let req = DiskIdsRequest {
            disk_ids: vec![disk_id],
            instance_id: Some(instance_id),
        };
        let _: Ack = self.client.call(SERVICE, VERSION, "DetachDisks", &req).await?;
        Ok(())
    }

    // ---- Snapshots ----

    pub async fn create_snapshot(&self, disk_id: &str, name: &str) -> Result<String, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            disk_id: &'a str,
            snapshot_name: &'a str,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            snapshot_id: String,
        }
        let req = Req {
            disk_id,
            snapshot_name: name,
        };
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "CreateSnapshot", &req)
            .await?;
        if resp.snapshot_id.is_empty() {
            return Err(ApiError::EmptyResponse("CreateSnapshot".to_string()));
        }
        Ok(resp.snapshot_id)
    }

    pub async fn describe_snapshot(&self, snapshot_id: &str) -> Result<Option<Snapshot>, ApiError> {
        let mut req = DescribeRequest::page(&[], 0, PAGE_LIMIT);
        req.snapshot_ids = Some(vec![snapshot_id]);
        let resp: DescribeSnapshotsResponse = self
            .client
            .call(SERVICE, VERSION, "DescribeSnapshots", &req)
            .await?;
        Ok(resp
            .snapshot_set
            .into_iter()
            .find(|s| s.snapshot_id == snapshot_id))
    }

    pub async fn describe_snapshots(&self, filters: &[Filter]) -> Result<Vec<Snapshot>, ApiError> {
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = DescribeRequest::page(filters, offset, limit);
            let resp: DescribeSnapshotsResponse = self
                .client
                .call(SERVICE, VERSION, "DescribeSnapshots", &req)
                .await?;
            Ok((resp.snapshot_set, resp.total_count))
        })
        .await
    }

    pub async fn modify_snapshot_name(&self, snapshot_id: &str, name: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            snapshot_id: &'a str,
            snapshot_name: &'a str,
        }
        let req = Req {
            snapshot_id,
            snapshot_name: name,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifySnapshotAttribute", &req)
            .await?;
        Ok(())
    }

    pub async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            snapshot_ids: Vec<&'a str>,
        }
        let req = Req {
            snapshot_ids: vec![snapshot_id],
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "DeleteSnapshots", &req)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_disk_request_shape() {
        let req = CreateDiskRequest {
            placement: Placement {
                zone: "ap-guangzhou-3".to_string(),
                project_id: Some(0),
            },
            disk_charge_type: "POSTPAID_BY_HOUR".to_string(),
            disk_type: "CLOUD_PREMIUM".to_string(),
            disk_name: "data".to_string(),
            disk_size: 50,
            disk_count: 1,
            encrypt: Some("ENCRYPT".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["Placement"]["Zone"], "ap-guangzhou-3");
        assert_eq!(json["DiskCount"], 1);
        assert_eq!(json["Encrypt"], "ENCRYPT");
        assert!(json.get("SnapshotId").is_none());
        assert!(json.get("Tags").is_none());
    }

    #[test]
    fn test_disk_decodes_partial_payload() {
        let disk: Disk = serde_json::from_value(serde_json::json!({
            "DiskId": "disk-1",
            "DiskState": "ATTACHED",
            "Attached": true,
            "InstanceId": "ins-1",
            "Placement": {"Zone": "ap-guangzhou-3", "ProjectId": 0}
        }))
        .unwrap();
        assert_eq!(disk.disk_state, DISK_STATE_ATTACHED);
        assert_eq!(disk.placement.project_id, Some(0));
        assert_eq!(disk.disk_size, 0);
    }
}
