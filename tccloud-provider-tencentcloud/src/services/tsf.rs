//! TSF microservice platform: namespaces, applications, deploy groups,
//! API groups with their gateway bindings, and application configs

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::paginate;
use crate::connectivity::TencentCloudClient;
use crate::error::ApiError;

const SERVICE: &str = "tsf";
const VERSION: &str = "2018-03-26";
pub const PAGE_LIMIT: u64 = 20;

/// TSF wraps every payload in `Result`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Page<T> {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default = "Vec::new")]
    content: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Namespace {
    pub namespace_id: String,
    pub namespace_code: String,
    pub namespace_name: String,
    pub namespace_desc: String,
    pub namespace_resource_type: String,
    pub namespace_type: String,
    pub namespace_status: String,
    pub is_ha_enable: String,
    pub is_default: String,
    pub cluster_id: String,
    pub creation_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Application {
    pub application_id: String,
    pub application_name: String,
    pub application_desc: String,
    pub application_type: String,
    pub microservice_type: String,
    pub application_runtime_type: String,
    pub program_id: String,
    pub create_time: String,
    pub update_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Group {
    pub group_id: String,
    pub group_name: String,
    pub group_desc: String,
    pub group_status: String,
    pub group_resource_type: String,
    pub application_id: String,
    pub namespace_id: String,
    pub cluster_id: String,
    pub alias: String,
    pub create_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApiGroup {
    pub group_id: String,
    pub group_name: String,
    pub group_context: String,
    pub auth_type: String,
    pub status: String,
    pub description: String,
    pub group_type: String,
    pub gateway_instance_id: String,
    pub namespace_name_key: String,
    pub service_name_key: String,
    pub namespace_name_key_position: String,
    pub service_name_key_position: String,
    pub created_time: String,
    pub api_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GatewayDeployGroup {
    pub deploy_group_id: String,
    pub deploy_group_name: String,
    pub application_id: String,
    pub group_status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub config_id: String,
    pub config_name: String,
    pub config_version: String,
    pub config_version_desc: String,
    pub config_value: String,
    pub config_type: String,
    pub application_id: String,
    pub creation_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConfigRelease {
    pub config_release_id: String,
    pub config_id: String,
    pub group_id: String,
    pub release_desc: String,
    pub release_time: String,
}

/// Arguments of `CreateNamespace`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateNamespaceRequest {
    pub namespace_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ha_enable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
}

/// Arguments of `ModifyNamespace`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyNamespaceRequest {
    pub namespace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ha_enable: Option<String>,
}

/// Arguments of `CreateApplication`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateApplicationRequest {
    pub application_name: String,
    pub application_type: String,
    pub microservice_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_runtime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
}

/// Arguments of `CreateGroup`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGroupRequest {
    pub application_id: String,
    pub namespace_id: String,
    pub group_name: String,
    pub cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Arguments of `CreateApiGroup` and `UpdateApiGroup`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub group_name: String,
    pub group_context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Create only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    /// Create only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_name_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_name_key_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name_key_position: Option<String>,
}

/// Arguments of `CreateConfigWithDetailResp`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateConfigRequest {
    pub config_name: String,
    pub config_version: String,
    pub config_value: String,
    pub application_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_version_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encode_with_base64: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GroupGateway<'a> {
    gateway_deploy_group_id: &'a str,
    group_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GroupGatewayList<'a> {
    group_gateway_list: Vec<GroupGateway<'a>>,
}

pub struct TsfService<'a> {
    client: &'a TencentCloudClient,
}

impl<'a> TsfService<'a> {
    pub fn new(client: &'a TencentCloudClient) -> Self {
        Self { client }
    }

    async fn result<Req, T>(&self, action: &str, req: &Req) -> Result<Option<T>, ApiError>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let envelope: Envelope<T> = self.client.call(SERVICE, VERSION, action, req).await?;
        Ok(envelope.result)
    }

    /// Id returned in `Result` by the create actions
    async fn created_id<Req: Serialize + ?Sized>(
        &self,
        action: &str,
        req: &Req,
    ) -> Result<String, ApiError> {
        self.result::<_, String>(action, req)
            .await?
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::EmptyResponse(action.to_string()))
    }

    /// Mutations answer `Result: true` on success
    async fn confirm<Req: Serialize + ?Sized>(&self, action: &str, req: &Req) -> Result<(), ApiError> {
        match self.result::<_, bool>(action, req).await? {
            Some(false) => Err(ApiError::vendor(
                "FailedOperation",
                format!("{} returned false", action),
                "",
            )),
            _ => Ok(()),
        }
    }

    // ---- Namespaces ----

    pub async fn create_namespace(&self, req: &CreateNamespaceRequest) -> Result<String, ApiError> {
        self.created_id("CreateNamespace", req).await
    }

    pub async fn describe_namespace(&self, namespace_id: &str) -> Result<Option<Namespace>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            namespace_id: &'a str,
        }
        let page: Option<Page<Namespace>> = self
            .result("DescribeSimpleNamespaces", &Req { namespace_id })
            .await?;
        Ok(page.and_then(|p| p.content.into_iter().next()))
    }

    pub async fn modify_namespace(&self, req: &ModifyNamespaceRequest) -> Result<(), ApiError> {
        self.confirm("ModifyNamespace", req).await
    }

    pub async fn delete_namespace(
        &self,
        namespace_id: &str,
        cluster_id: Option<&str>,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            namespace_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            cluster_id: Option<&'a str>,
        }
        self.confirm(
            "DeleteNamespace",
            &Req {
                namespace_id,
                cluster_id,
            },
        )
        .await
    }

    // ---- Applications ----

    pub async fn create_application(
        &self,
        req: &CreateApplicationRequest,
    ) -> Result<String, ApiError> {
        self.created_id("CreateApplication", req).await
    }

    pub async fn describe_application(
        &self,
        application_id: &str,
    ) -> Result<Option<Application>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            application_id: &'a str,
        }
        let app: Option<Application> = self
            .result("DescribeApplication", &Req { application_id })
            .await?;
        Ok(app.filter(|a| !a.application_id.is_empty()))
    }

    pub async fn describe_applications(
        &self,
        application_type: Option<&str>,
        microservice_type: Option<&str>,
        search_word: Option<&str>,
    ) -> Result<Vec<Application>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            application_type: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            microservice_type: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            search_word: Option<&'a str>,
            offset: u64,
            limit: u64,
        }
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = Req {
                application_type,
                microservice_type,
                search_word,
                offset,
                limit,
            };
            let page: Option<Page<Application>> =
                self.result("DescribeApplications", &req).await?;
            Ok(page
                .map(|p| (p.content, p.total_count))
                .unwrap_or((Vec::new(), Some(0))))
        })
        .await
    }

    pub async fn modify_application(
        &self,
        application_id: &str,
        application_name: Option<&str>,
        application_desc: Option<&str>,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            application_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            application_name: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            application_desc: Option<&'a str>,
        }
        let req = Req {
            application_id,
            application_name,
            application_desc,
        };
        self.confirm("ModifyApplication", &req).await
    }

    pub async fn delete_application(&self, application_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            application_id: &'a str,
        }
        self.confirm("DeleteApplication", &Req { application_id })
            .await
    }

    // ---- Deploy groups ----

    pub async fn create_group(&self, req: &CreateGroupRequest) -> Result<String, ApiError> {
        self.created_id("CreateGroup", req).await
    }

    pub async fn describe_group(&self, group_id: &str) -> Result<Option<Group>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            group_id: &'a str,
        }
        let group: Option<Group> = self.result("DescribeGroup", &Req { group_id }).await?;
        Ok(group.filter(|g| !g.group_id.is_empty()))
    }

    pub async fn modify_group(
        &self,
        group_id: &str,
        group_desc: Option<&str>,
        alias: Option<&str>,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            group_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            group_desc: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            alias: Option<&'a str>,
        }
        let req = Req {
            group_id,
            group_desc,
            alias,
        };
        self.confirm("ModifyGroup", &req).await
    }

    pub async fn delete_group(&self, group_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            group_id: &'a str,
        }
        self.confirm("DeleteGroup", &Req { group_id }).await
    }

    // ---- API groups ----

    pub async fn create_api_group(&self, req: &ApiGroupRequest) -> Result<String, ApiError> {
        self.created_id("CreateApiGroup", req).await
    }

    pub async fn describe_api_group(&self, group_id: &str) -> Result<Option<ApiGroup>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            group_id: &'a str,
        }
        let group: Option<ApiGroup> = self.result("DescribeApiGroup", &Req { group_id }).await?;
        Ok(group.filter(|g| !g.group_id.is_empty()))
    }

    pub async fn update_api_group(&self, req: &ApiGroupRequest) -> Result<(), ApiError> {
        self.confirm("UpdateApiGroup", req).await
    }

    pub async fn delete_api_group(&self, group_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            group_id: &'a str,
        }
        self.confirm("DeleteApiGroup", &Req { group_id }).await
    }

    pub async fn bind_api_group(
        &self,
        group_id: &str,
        gateway_deploy_group_id: &str,
    ) -> Result<(), ApiError> {
        let req = GroupGatewayList {
            group_gateway_list: vec![GroupGateway {
                gateway_deploy_group_id,
                group_id,
            }],
        };
        self.confirm("BindApiGroup", &req).await
    }

    /// Gateway deploy groups bound to an API group
    pub async fn describe_group_binded_gateways(
        &self,
        group_id: &str,
    ) -> Result<Vec<GatewayDeployGroup>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            group_id: &'a str,
            offset: u64,
            limit: u64,
        }
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = Req {
                group_id,
                offset,
                limit,
            };
            let page: Option<Page<GatewayDeployGroup>> =
                self.result("DescribeGroupBindedGateways", &req).await?;
            Ok(page
                .map(|p| (p.content, p.total_count))
                .unwrap_or((Vec::new(), Some(0))))
        })
        .await
    }

    pub async fn unbind_api_group(
        &self,
        group_id: &str,
        gateway_deploy_group_id: &str,
    ) -> Result<(), ApiError> {
        let req = GroupGatewayList {
            group_gateway_list: vec![GroupGateway {
                gateway_deploy_group_id,
                group_id,
            }],
        };
        self.confirm("UnbindApiGroup", &req).await
    }

    // ---- Application configs ----

    pub async fn create_config(&self, req: &CreateConfigRequest) -> Result<String, ApiError> {
        let config: Option<Config> = self.result("CreateConfigWithDetailResp", req).await?;
        config
            .map(|c| c.config_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::EmptyResponse("CreateConfigWithDetailResp".to_string()))
    }

    pub async fn describe_config(&self, config_id: &str) -> Result<Option<Config>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            config_id: &'a str,
        }
        let page: Option<Page<Config>> = self.result("DescribeConfigs", &Req { config_id }).await?;
        Ok(page.and_then(|p| p.content.into_iter().find(|c| c.config_id == config_id)))
    }

    pub async fn delete_config(&self, config_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            config_id: &'a str,
        }
        self.confirm("DeleteConfig", &Req { config_id }).await
    }

    pub async fn release_config(
        &self,
        config_id: &str,
        group_id: &str,
        release_desc: Option<&str>,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            config_id: &'a str,
            group_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            release_desc: Option<&'a str>,
        }
        let req = Req {
            config_id,
            group_id,
            release_desc,
        };
        self.confirm("ReleaseConfig", &req).await
    }

    pub async fn describe_config_release(
        &self,
        config_id: &str,
        group_id: &str,
    ) -> Result<Option<ConfigRelease>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            config_id: &'a str,
            group_id: &'a str,
        }
        let page: Option<Page<ConfigRelease>> = self
            .result("DescribeConfigReleases", &Req { config_id, group_id })
            .await?;
        Ok(page.and_then(|p| p.content.into_iter().next()))
    }

    pub async fn revoke_config(&self, config_release_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            config_release_id: &'a str,
        }
        self.confirm("RevocationConfig", &Req { config_release_id })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decodes_page() {
        let envelope: Envelope<Page<Namespace>> = serde_json::from_value(serde_json::json!({
            "Result": {
                "TotalCount": 1,
                "Content": [{"NamespaceId": "namespace-1", "NamespaceName": "dev", "IsHaEnable": "0"}]
            },
            "RequestId": "r"
        }))
        .unwrap();
        let page = envelope.result.unwrap();
        assert_eq!(page.total_count, Some(1));
        assert_eq!(page.content[0].namespace_id, "namespace-1");
        assert_eq!(page.content[0].is_ha_enable, "0");
    }

    #[test]
    fn test_envelope_tolerates_missing_result() {
        let envelope: Envelope<bool> =
            serde_json::from_value(serde_json::json!({"RequestId": "r"})).unwrap();
        assert!(envelope.result.is_none());
    }

    #[test]
    fn test_api_group_update_omits_create_only_fields() {
        let req = ApiGroupRequest {
            group_id: Some("grp-1".to_string()),
            group_name: "orders".to_string(),
            group_context: "/orders".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"GroupId": "grp-1", "GroupName": "orders", "GroupContext": "/orders"})
        );
    }

    #[test]
    fn test_bind_request_shape() {
        let req = GroupGatewayList {
            group_gateway_list: vec![GroupGateway {
                gateway_deploy_group_id: "group-gw",
                group_id: "grp-1",
            }],
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"GroupGatewayList": [{"GatewayDeployGroupId": "group-gw", "GroupId": "grp-1"}]})
        );
    }
}
