//! TcaplusDB: applications (clusters), zones (table groups), IDL files,
//! tables and their background tasks

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::{Ack, paginate};
use crate::connectivity::TencentCloudClient;
use crate::error::ApiError;

const SERVICE: &str = "tcaplusdb";
const VERSION: &str = "2019-08-23";
pub const PAGE_LIMIT: u64 = 20;

/// Progress of a finished task
pub const TASK_DONE_PROGRESS: i64 = 100;

/// `{Name, Value}` filter of the TcaplusDB describes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TcaplusFilter {
    pub name: String,
    pub value: String,
}

impl TcaplusFilter {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub cluster_name: String,
    pub idl_type: String,
    pub network_type: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub created_time: String,
    pub password_status: String,
    pub api_access_id: String,
    pub api_access_ip: String,
    pub api_access_port: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TableGroupInfo {
    pub table_group_id: String,
    pub table_group_name: String,
    pub created_time: String,
    pub table_count: i64,
    pub total_size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IdlFileInfo {
    pub file_name: String,
    pub file_type: String,
    pub file_ext_type: String,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParsedTableInfo {
    pub table_name: String,
    pub table_idl_type: String,
    pub table_type: String,
    pub key_fields: String,
    pub value_fields: String,
    pub sum_key_field_size: i64,
    pub sum_value_field_size: i64,
    pub index_key_set: String,
    pub sharding_key_set: String,
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TableInfo {
    pub table_name: String,
    pub table_instance_id: String,
    pub table_type: String,
    pub table_idl_type: String,
    pub table_group_id: String,
    pub memo: String,
    pub status: String,
    pub reserved_read_qps: i64,
    pub reserved_write_qps: i64,
    pub reserved_volume: i64,
    pub table_size: i64,
    pub created_time: String,
    pub idl_files: Vec<IdlFileInfo>,
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TaskInfo {
    pub task_id: String,
    pub task_type: String,
    pub progress: i64,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TableResult {
    task_id: String,
    table_instance_id: String,
    error: Option<ErrorInfo>,
}

/// One table selected by a table operation
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelectedTable {
    pub table_group_id: String,
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_idl_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_read_qps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_write_qps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_volume: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Identity of an uploaded IDL file; serialized as the resource id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlId {
    pub app_id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_ext_type: String,
    pub file_size: i64,
    pub file_id: i64,
}

impl IdlId {
    pub fn encode(&self) -> Result<String, ApiError> {
        serde_json::to_string(self).map_err(|source| ApiError::Decode {
            action: "IdlId".to_string(),
            source,
        })
    }

    pub fn decode(id: &str) -> Result<Self, ApiError> {
        serde_json::from_str(id)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid IDL id '{}': {}", id, e)))
    }

    fn file_info(&self) -> IdlFileInfo {
        IdlFileInfo {
            file_name: self.file_name.clone(),
            file_type: self.file_type.clone(),
            file_ext_type: self.file_ext_type.clone(),
            file_size: self.file_size,
            file_id: Some(self.file_id),
            file_content: None,
        }
    }
}

/// Zone ids are `<applicationId>:<zoneId>`
pub fn zone_id_encode(app_id: &str, zone_id: &str) -> String {
    format!("{}:{}", app_id, zone_id)
}

/// Split a composite zone id into `(application_id, table_group_id)`
pub fn zone_id_decode(id: &str) -> Result<(String, String), ApiError> {
    match id.split(':').collect::<Vec<_>>().as_slice() {
        [app, zone] if !app.is_empty() && !zone.is_empty() => {
            Ok((app.to_string(), zone.to_string()))
        }
        _ => Err(ApiError::InvalidRequest(format!("zone id is broken: {}", id))),
    }
}

/// Table ids are `<applicationId>:<tableInstanceId>`
pub fn table_id_encode(app_id: &str, table_instance_id: &str) -> String {
    format!("{}:{}", app_id, table_instance_id)
}

pub fn table_id_decode(id: &str) -> Result<(String, String), ApiError> {
    match id.split_once(':') {
        Some((app, table)) if !app.is_empty() && !table.is_empty() && !table.contains(':') => {
            Ok((app.to_string(), table.to_string()))
        }
        _ => Err(ApiError::InvalidRequest(format!("table id is broken: {}", id))),
    }
}

/// IDL content as uploaded: base64 of the url-escaped text
pub fn encode_idl_content(content: &str) -> String {
    let escaped: String = url::form_urlencoded::byte_serialize(content.as_bytes()).collect();
    STANDARD.encode(escaped)
}

/// `OldPasswordExpireTime`: `now + seconds` in UTC+8
pub fn password_expire_time(now: DateTime<Utc>, seconds: i64) -> String {
    let shanghai = FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix());
    (now + chrono::Duration::seconds(seconds))
        .with_timezone(&shanghai)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn single_table_result(action: &str, results: Vec<TableResult>) -> Result<TableResult, ApiError> {
    let mut results = results.into_iter();
    let result = results
        .next()
        .ok_or_else(|| ApiError::EmptyResponse(action.to_string()))?;
    if results.next().is_some() {
        return Err(ApiError::InvalidRequest(format!(
            "{} returned several table results for one table",
            action
        )));
    }
    if let Some(error) = result.error.as_ref().filter(|e| !e.code.is_empty() || !e.message.is_empty()) {
        return Err(ApiError::vendor(error.code.clone(), error.message.clone(), ""));
    }
    Ok(result)
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TableResultsResponse {
    #[serde(default)]
    table_results: Vec<TableResult>,
}

pub struct TcaplusService<'a> {
    client: &'a TencentCloudClient,
}

impl<'a> TcaplusService<'a> {
    pub fn new(client: &'a TencentCloudClient) -> Self {
        Self { client }
    }

    // ---- Applications ----

    pub async fn create_app(
        &self,
        idl_type: &str,
        app_name: &str,
        vpc_id: &str,
        subnet_id: &str,
        password: &str,
    ) -> Result<String, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            idl_type: &'a str,
            cluster_name: &'a str,
            vpc_id: &'a str,
            subnet_id: &'a str,
            password: &'a str,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            cluster_id: String,
        }
        let req = Req {
            idl_type,
            cluster_name: app_name,
            vpc_id,
            subnet_id,
            password,
        };
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "CreateCluster", &req)
            .await?;
        if resp.cluster_id.is_empty() {
            return Err(ApiError::EmptyResponse("CreateCluster".to_string()));
        }
        Ok(resp.cluster_id)
    }

    /// Applications matching an id and/or a name; neither lists all
    pub async fn describe_apps(
        &self,
        app_id: Option<&str>,
        app_name: Option<&str>,
    ) -> Result<Vec<ClusterInfo>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            cluster_ids: Option<Vec<&'a str>>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            filters: Vec<TcaplusFilter>,
            offset: u64,
            limit: u64,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            total_count: Option<u64>,
            #[serde(default)]
            clusters: Vec<ClusterInfo>,
        }

        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = Req {
                cluster_ids: app_id.map(|id| vec![id]),
                filters: app_name
                    .map(|name| vec![TcaplusFilter::new("ClusterName", name)])
                    .unwrap_or_default(),
                offset,
                limit,
            };
            let resp: Resp = self
                .client
                .call(SERVICE, VERSION, "DescribeClusters", &req)
                .await?;
            Ok((resp.clusters, resp.total_count))
        })
        .await
    }

    pub async fn describe_app(&self, app_id: &str) -> Result<Option<ClusterInfo>, ApiError> {
        let apps = self.describe_apps(Some(app_id), None).await?;
        Ok(apps.into_iter().find(|a| a.cluster_id == app_id))
    }

    /// Returns the id of the deletion task
    pub async fn delete_app(&self, app_id: &str) -> Result<String, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            task_id: String,
        }
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "DeleteCluster", &Req { cluster_id: app_id })
            .await?;
        Ok(resp.task_id)
    }

    pub async fn modify_app_name(&self, app_id: &str, app_name: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            cluster_name: &'a str,
        }
        let req = Req {
            cluster_id: app_id,
            cluster_name: app_name,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyClusterName", &req)
            .await?;
        Ok(())
    }

    /// Rotate the password; the old one stays valid for `old_password_expire_last` seconds
    pub async fn modify_app_password(
        &self,
        app_id: &str,
        old_password: &str,
        new_password: &str,
        old_password_expire_last: i64,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            old_password: &'a str,
            new_password: &'a str,
            mode: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            old_password_expire_time: Option<String>,
        }
        let req = Req {
            cluster_id: app_id,
            old_password,
            new_password,
            mode: "1",
            old_password_expire_time: (old_password_expire_last > 0)
                .then(|| password_expire_time(Utc::now(), old_password_expire_last)),
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyClusterPassword", &req)
            .await?;
        Ok(())
    }

    // ---- Tasks ----

    pub async fn describe_task(&self, app_id: &str, task_id: &str) -> Result<Option<TaskInfo>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_ids: Vec<&'a str>,
            task_ids: Vec<&'a str>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            task_infos: Vec<TaskInfo>,
        }
        let req = Req {
            cluster_ids: vec![app_id],
            task_ids: vec![task_id],
        };
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "DescribeTasks", &req)
            .await?;
        if resp.task_infos.len() > 1 {
            return Err(ApiError::InvalidRequest(format!(
                "DescribeTasks returned {} tasks for task {}",
                resp.task_infos.len(),
                task_id
            )));
        }
        Ok(resp.task_infos.into_iter().next())
    }

    // ---- Zones ----

    pub async fn create_zone(&self, app_id: &str, zone_name: &str) -> Result<String, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            table_group_name: &'a str,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            table_group_id: String,
        }
        let req = Req {
            cluster_id: app_id,
            table_group_name: zone_name,
        };
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "CreateTableGroup", &req)
            .await?;
        if resp.table_group_id.is_empty() {
            return Err(ApiError::EmptyResponse("CreateTableGroup".to_string()));
        }
        Ok(resp.table_group_id)
    }

    pub async fn describe_zones(
        &self,
        app_id: &str,
        zone_id: Option<&str>,
        zone_name: Option<&str>,
    ) -> Result<Vec<TableGroupInfo>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            table_group_ids: Option<Vec<&'a str>>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            filters: Vec<TcaplusFilter>,
            offset: u64,
            limit: u64,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            total_count: Option<u64>,
            #[serde(default)]
            table_groups: Vec<TableGroupInfo>,
        }

        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = Req {
                cluster_id: app_id,
                table_group_ids: zone_id.map(|id| vec![id]),
                filters: zone_name
                    .map(|name| vec![TcaplusFilter::new("TableGroupName", name)])
                    .unwrap_or_default(),
                offset,
                limit,
            };
            let resp: Resp = self
                .client
                .call(SERVICE, VERSION, "DescribeTableGroups", &req)
                .await?;
            Ok((resp.table_groups, resp.total_count))
        })
        .await
    }

    pub async fn describe_zone(
        &self,
        app_id: &str,
        zone_id: &str,
    ) -> Result<Option<TableGroupInfo>, ApiError> {
        let zones = self.describe_zones(app_id, Some(zone_id), None).await?;
        Ok(zones.into_iter().find(|z| z.table_group_id == zone_id))
    }

    pub async fn modify_zone_name(
        &self,
        app_id: &str,
        zone_id: &str,
        zone_name: &str,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            table_group_id: &'a str,
            table_group_name: &'a str,
        }
        let req = Req {
            cluster_id: app_id,
            table_group_id: zone_id,
            table_group_name: zone_name,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyTableGroupName", &req)
            .await?;
        Ok(())
    }

    pub async fn delete_zone(&self, app_id: &str, zone_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            table_group_id: &'a str,
        }
        let req = Req {
            cluster_id: app_id,
            table_group_id: zone_id,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "DeleteTableGroup", &req)
            .await?;
        Ok(())
    }

    // ---- IDL files ----

    /// Upload and verify a new IDL file; returns the file id and the parsed tables
    pub async fn verify_new_idl(
        &self,
        app_id: &str,
        table_group_id: &str,
        file: IdlFileInfo,
    ) -> Result<(i64, Vec<ParsedTableInfo>), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            table_group_id: &'a str,
            new_idl_files: Vec<IdlFileInfo>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            idl_files: Vec<IdlFileInfo>,
            #[serde(default)]
            table_infos: Vec<ParsedTableInfo>,
        }
        let req = Req {
            cluster_id: app_id,
            table_group_id,
            new_idl_files: vec![file],
        };
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "VerifyIdlFiles", &req)
            .await?;

        let file_id = match resp.idl_files.as_slice() {
            [only] => only
                .file_id
                .ok_or_else(|| ApiError::EmptyResponse("VerifyIdlFiles".to_string()))?,
            [] => return Err(ApiError::EmptyResponse("VerifyIdlFiles".to_string())),
            files => {
                return Err(ApiError::InvalidRequest(format!(
                    "VerifyIdlFiles returned {} files for one upload",
                    files.len()
                )));
            }
        };
        Ok((file_id, resp.table_infos))
    }

    /// Tables parsed from an existing IDL file; `None` when the file is gone
    pub async fn describe_idl_tables(
        &self,
        idl: &IdlId,
    ) -> Result<Option<Vec<ParsedTableInfo>>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            existing_idl_files: Vec<IdlFileInfo>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            table_infos: Vec<ParsedTableInfo>,
        }
        let req = Req {
            cluster_id: &idl.app_id,
            existing_idl_files: vec![idl.file_info()],
        };
        match self
            .client
            .call::<_, Resp>(SERVICE, VERSION, "VerifyIdlFiles", &req)
            .await
        {
            Ok(resp) => Ok(Some(resp.table_infos)),
            Err(e) if e.code() == Some("ResourceNotFound") => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_idl(&self, idl: &IdlId) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            idl_files: Vec<IdlFileInfo>,
        }
        let req = Req {
            cluster_id: &idl.app_id,
            idl_files: vec![idl.file_info()],
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "DeleteIdlFiles", &req)
            .await?;
        Ok(())
    }

    pub async fn describe_idl_files(&self, app_id: &str) -> Result<Vec<IdlFileInfo>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            offset: u64,
            limit: u64,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            total_count: Option<u64>,
            #[serde(default)]
            idl_file_infos: Vec<IdlFileInfo>,
        }
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = Req {
                cluster_id: app_id,
                offset,
                limit,
            };
            let resp: Resp = self
                .client
                .call(SERVICE, VERSION, "DescribeIdlFileInfos", &req)
                .await?;
            Ok((resp.idl_file_infos, resp.total_count))
        })
        .await
    }

    // ---- Tables ----

    /// Returns `(task_id, table_instance_id)`
    pub async fn create_table(
        &self,
        idl: &IdlId,
        table: SelectedTable,
    ) -> Result<(String, String), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            idl_files: Vec<IdlFileInfo>,
            selected_tables: Vec<SelectedTable>,
        }
        let req = Req {
            cluster_id: &idl.app_id,
            idl_files: vec![idl.file_info()],
            selected_tables: vec![table],
        };
        let resp: TableResultsResponse = self
            .client
            .call(SERVICE, VERSION, "CreateTables", &req)
            .await?;
        let result = single_table_result("CreateTables", resp.table_results)?;
        Ok((result.task_id, result.table_instance_id))
    }

    pub async fn describe_tables(
        &self,
        app_id: &str,
        zone_id: Option<&str>,
        table_id: Option<&str>,
        table_name: Option<&str>,
    ) -> Result<Vec<TableInfo>, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            table_group_ids: Option<Vec<&'a str>>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            filters: Vec<TcaplusFilter>,
            offset: u64,
            limit: u64,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            #[serde(default)]
            total_count: Option<u64>,
            #[serde(default)]
            table_infos: Vec<TableInfo>,
        }

        paginate(PAGE_LIMIT, |offset, limit| async move {
            let mut filters = Vec::new();
            if let Some(id) = table_id {
                filters.push(TcaplusFilter::new("TableInstanceId", id));
            }
            if let Some(name) = table_name {
                filters.push(TcaplusFilter::new("TableName", name));
            }
            let req = Req {
                cluster_id: app_id,
                table_group_ids: zone_id.map(|id| vec![id]),
                filters,
                offset,
                limit,
            };
            let resp: Resp = self
                .client
                .call(SERVICE, VERSION, "DescribeTables", &req)
                .await?;
            Ok((resp.table_infos, resp.total_count))
        })
        .await
    }

    pub async fn describe_table(
        &self,
        app_id: &str,
        table_instance_id: &str,
    ) -> Result<Option<TableInfo>, ApiError> {
        match self
            .describe_tables(app_id, None, Some(table_instance_id), None)
            .await
        {
            Ok(tables) => Ok(tables
                .into_iter()
                .find(|t| t.table_instance_id == table_instance_id)),
            Err(e) if e.code() == Some("ResourceNotFound") => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns the id of the deletion task
    pub async fn delete_table(&self, app_id: &str, table: SelectedTable) -> Result<String, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            selected_tables: Vec<SelectedTable>,
        }
        let req = Req {
            cluster_id: app_id,
            selected_tables: vec![table],
        };
        let resp: TableResultsResponse = self
            .client
            .call(SERVICE, VERSION, "DeleteTables", &req)
            .await?;
        Ok(single_table_result("DeleteTables", resp.table_results)?.task_id)
    }

    pub async fn modify_table_memo(&self, app_id: &str, table: SelectedTable) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            table_memos: Vec<SelectedTable>,
        }
        let req = Req {
            cluster_id: app_id,
            table_memos: vec![table],
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyTableMemos", &req)
            .await?;
        Ok(())
    }

    /// Switch a table to another IDL file; returns the task id
    pub async fn modify_table_idl(
        &self,
        idl: &IdlId,
        table: SelectedTable,
    ) -> Result<String, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            cluster_id: &'a str,
            idl_files: Vec<IdlFileInfo>,
            selected_tables: Vec<SelectedTable>,
        }
        let req = Req {
            cluster_id: &idl.app_id,
            idl_files: vec![idl.file_info()],
            selected_tables: vec![table],
        };
        let resp: TableResultsResponse = self
            .client
            .call(SERVICE, VERSION, "ModifyTables", &req)
            .await?;
        Ok(single_table_result("ModifyTables", resp.table_results)?.task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_zone_id() {
        assert_eq!(zone_id_encode("31xxx", "2"), "31xxx:2");
        assert_eq!(
            zone_id_decode("31xxx:2").unwrap(),
            ("31xxx".to_string(), "2".to_string())
        );
        assert!(zone_id_decode("31xxx").is_err());
        assert!(zone_id_decode("a:b:c").is_err());
        assert!(zone_id_decode(":2").is_err());
    }

    #[test]
    fn test_table_id() {
        assert_eq!(table_id_encode("31xxx", "tcaplus-1a2b"), "31xxx:tcaplus-1a2b");
        assert_eq!(
            table_id_decode("31xxx:tcaplus-1a2b").unwrap(),
            ("31xxx".to_string(), "tcaplus-1a2b".to_string())
        );
        assert!(table_id_decode("tcaplus-1a2b").is_err());
        assert!(table_id_decode("31xxx:").is_err());
    }

    #[test]
    fn test_idl_id_round_trip() {
        let idl = IdlId {
            app_id: "app".to_string(),
            file_name: "tb_online".to_string(),
            file_type: "PROTO".to_string(),
            file_ext_type: "proto".to_string(),
            file_size: 120,
            file_id: 42,
        };
        let encoded = idl.encode().unwrap();
        assert!(encoded.contains("\"file_id\":42"));
        assert_eq!(IdlId::decode(&encoded).unwrap(), idl);
        assert!(IdlId::decode("not-json").is_err());
    }

    #[test]
    fn test_encode_idl_content() {
        let encoded = encode_idl_content("a b&c");
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "a+b%26c");
    }

    #[test]
    fn test_password_expire_time_is_utc_plus_8() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap();
        assert_eq!(password_expire_time(now, 3600), "2024-01-02 05:00:00");
    }

    #[test]
    fn test_single_table_result_surfaces_error() {
        let results = vec![TableResult {
            task_id: String::new(),
            table_instance_id: String::new(),
            error: Some(ErrorInfo {
                code: "InvalidParameterValue".to_string(),
                message: "bad qps".to_string(),
            }),
        }];
        let err = single_table_result("CreateTables", results).unwrap_err();
        assert_eq!(err.code(), Some("InvalidParameterValue"));

        assert!(matches!(
            single_table_result("CreateTables", Vec::new()),
            Err(ApiError::EmptyResponse(_))
        ));
    }
}
