//! Compute instances

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Ack, Tag, paginate};
use crate::connectivity::{TencentCloudClient, decode_legacy};
use crate::error::ApiError;
use crate::helper::{Filter, build_filters_param};

const SERVICE: &str = "cvm";
const VERSION: &str = "2017-03-12";
pub const PAGE_LIMIT: u64 = 100;

pub const INSTANCE_STATUS_RUNNING: &str = "RUNNING";
pub const INSTANCE_STATUS_STOPPED: &str = "STOPPED";
pub const INSTANCE_STATUS_LAUNCH_FAILED: &str = "LAUNCH_FAILED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Placement {
    pub zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VirtualPrivateCloud {
    pub vpc_id: String,
    pub subnet_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SystemDisk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InternetAccessible {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_max_bandwidth_out: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip_assigned: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Instance {
    pub instance_id: String,
    pub instance_name: String,
    pub instance_type: String,
    pub instance_state: String,
    pub instance_charge_type: String,
    pub placement: Placement,
    pub image_id: String,
    pub private_ip_addresses: Vec<String>,
    pub public_ip_addresses: Vec<String>,
    pub security_group_ids: Vec<String>,
    pub virtual_private_cloud: VirtualPrivateCloud,
    pub system_disk: SystemDisk,
    pub internet_accessible: InternetAccessible,
    #[serde(rename = "CPU")]
    pub cpu: i64,
    pub memory: i64,
    pub created_time: String,
    pub expired_time: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginSettings {
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagSpecification {
    pub resource_type: String,
    pub tags: Vec<Tag>,
}

/// Arguments of `RunInstances` for a single instance
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunInstancesRequest {
    pub instance_charge_type: String,
    pub placement: Placement,
    pub instance_type: String,
    pub image_id: String,
    pub instance_count: i64,
    pub instance_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_disk: Option<SystemDisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_private_cloud: Option<VirtualPrivateCloud>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_accessible: Option<InternetAccessible>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_settings: Option<LoginSettings>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_specification: Vec<TagSpecification>,
}

/// One row of `DescribeInstanceTypeConfigs`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InstanceTypeConfig {
    pub zone: String,
    pub instance_type: String,
    pub instance_family: String,
    #[serde(rename = "CPU")]
    pub cpu: i64,
    pub memory: i64,
    #[serde(rename = "GPU")]
    pub gpu: i64,
    #[serde(rename = "FPGA")]
    pub fpga: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_ids: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "<[Filter]>::is_empty")]
    filters: &'a [Filter],
    offset: u64,
    limit: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    instance_set: Vec<Instance>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceIdsRequest<'a> {
    instance_ids: Vec<&'a str>,
}

pub struct CvmService<'a> {
    client: &'a TencentCloudClient,
}

impl<'a> CvmService<'a> {
    pub fn new(client: &'a TencentCloudClient) -> Self {
        Self { client }
    }

    pub async fn run_instance(&self, req: &RunInstancesRequest) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            instance_id_set: Vec<String>,
        }
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "RunInstances", req)
            .await?;
        resp.instance_id_set
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::EmptyResponse("RunInstances".to_string()))
    }

    pub async fn describe_instance(&self, instance_id: &str) -> Result<Option<Instance>, ApiError> {
        let req = DescribeInstancesRequest {
            instance_ids: Some(vec![instance_id]),
            filters: &[],
            offset: 0,
            limit: PAGE_LIMIT,
        };
        let resp: DescribeInstancesResponse = self
            .client
            .call(SERVICE, VERSION, "DescribeInstances", &req)
            .await?;
        Ok(resp
            .instance_set
            .into_iter()
            .find(|i| i.instance_id == instance_id))
    }

    pub async fn describe_instances(
        &self,
        instance_ids: &[String],
        filters: &[Filter],
    ) -> Result<Vec<Instance>, ApiError> {
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = DescribeInstancesRequest {
                instance_ids: (!instance_ids.is_empty())
                    .then(|| instance_ids.iter().map(String::as_str).collect()),
                filters,
                offset,
                limit,
            };
            let resp: DescribeInstancesResponse = self
                .client
                .call(SERVICE, VERSION, "DescribeInstances", &req)
                .await?;
            Ok((resp.instance_set, resp.total_count))
        })
        .await
    }

    pub async fn modify_instance_attribute(
        &self,
        instance_id: &str,
        instance_name: Option<&str>,
        security_groups: Option<&[String]>,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            instance_ids: Vec<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            instance_name: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            security_groups: Option<&'a [String]>,
        }
        let req = Req {
            instance_ids: vec![instance_id],
            instance_name,
            security_groups,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyInstancesAttribute", &req)
            .await?;
        Ok(())
    }

    pub async fn modify_project_id(&self, instance_id: &str, project_id: i64) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            instance_ids: Vec<&'a str>,
            project_id: i64,
        }
        let req = Req {
            instance_ids: vec![instance_id],
            project_id,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyInstancesProject", &req)
            .await?;
        Ok(())
    }

    pub async fn reset_instance_type(
        &self,
        instance_id: &str,
        instance_type: &str,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            instance_ids: Vec<&'a str>,
            instance_type: &'a str,
            force_stop: bool,
        }
        let req = Req {
            instance_ids: vec![instance_id],
            instance_type,
            force_stop: true,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ResetInstancesType", &req)
            .await?;
        Ok(())
    }

    pub async fn reset_instance_password(
        &self,
        instance_id: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            instance_ids: Vec<&'a str>,
            password: &'a str,
            force_stop: bool,
        }
        let req = Req {
            instance_ids: vec![instance_id],
            password,
            force_stop: true,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ResetInstancesPassword", &req)
            .await?;
        Ok(())
    }

    pub async fn start_instance(&self, instance_id: &str) -> Result<(), ApiError> {
        let req = InstanceIdsRequest {
            instance_ids: vec![instance_id],
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "StartInstances", &req)
            .await?;
        Ok(())
    }

    pub async fn stop_instance(&self, instance_id: &str) -> Result<(), ApiError> {
        let req = InstanceIdsRequest {
            instance_ids: vec![instance_id],
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "StopInstances", &req)
            .await?;
        Ok(())
    }

    pub async fn terminate_instance(&self, instance_id: &str) -> Result<(), ApiError> {
        let req = InstanceIdsRequest {
            instance_ids: vec![instance_id],
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "TerminateInstances", &req)
            .await?;
        Ok(())
    }

    /// Instance types on sale, through the legacy API
    pub async fn describe_instance_types(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<InstanceTypeConfig>, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "DescribeInstanceTypeConfigs".to_string());
        params.insert("Version".to_string(), VERSION.to_string());
        build_filters_param(&mut params, filters)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let body = self.client.send_request(SERVICE, params).await?;
        let value = decode_legacy("DescribeInstanceTypeConfigs", &body)?;

        let set = value
            .get("Response")
            .and_then(|r| r.get("InstanceTypeConfigSet"))
            .or_else(|| value.get("instanceTypeConfigSet"))
            .cloned()
            .unwrap_or(serde_json::Value::Array(Vec::new()));
        serde_json::from_value(set).map_err(|source| ApiError::Decode {
            action: "DescribeInstanceTypeConfigs".to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_instances_request_shape() {
        let req = RunInstancesRequest {
            instance_charge_type: "POSTPAID_BY_HOUR".to_string(),
            placement: Placement {
                zone: "ap-guangzhou-3".to_string(),
                project_id: None,
            },
            instance_type: "S5.SMALL2".to_string(),
            image_id: "img-1".to_string(),
            instance_count: 1,
            instance_name: "web".to_string(),
            login_settings: Some(LoginSettings {
                password: "Passw0rd!".to_string(),
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["Placement"], serde_json::json!({"Zone": "ap-guangzhou-3"}));
        assert_eq!(json["LoginSettings"]["Password"], "Passw0rd!");
        assert!(json.get("SecurityGroupIds").is_none());
        assert!(json.get("VirtualPrivateCloud").is_none());
    }

    #[test]
    fn test_instance_decodes_upper_case_fields() {
        let instance: Instance = serde_json::from_value(serde_json::json!({
            "InstanceId": "ins-1",
            "InstanceState": "RUNNING",
            "CPU": 2,
            "Memory": 4,
            "PrivateIpAddresses": ["10.0.0.2"]
        }))
        .unwrap();
        assert_eq!(instance.cpu, 2);
        assert_eq!(instance.private_ip_addresses, vec!["10.0.0.2"]);
        assert!(instance.public_ip_addresses.is_empty());
    }
}
