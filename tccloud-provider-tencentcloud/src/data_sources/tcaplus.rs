use serde_json::json;
use tccloud_core::provider::ProviderResult;
use tccloud_core::resource::Resource;

use super::{QueryResult, input};
use crate::TencentCloudProvider;
use crate::resources::required_str;
use crate::services::read_retry;
use crate::services::tcaplus::{IdlId, zone_id_decode, zone_id_encode};

/// Zone filters accept both `<app>:<zone>` ids and bare table group ids
fn table_group_of(zone_id: &str) -> ProviderResult<String> {
    if zone_id.contains(':') {
        Ok(zone_id_decode(zone_id)?.1)
    } else {
        Ok(zone_id.to_string())
    }
}

impl TencentCloudProvider {
    pub(super) async fn query_tcaplus_applications(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let app_id = input(resource, "app_id");
        let app_name = input(resource, "app_name");

        let apps =
            read_retry(|| async move { self.tcaplus().describe_apps(app_id, app_name).await }).await?;

        let mut result = QueryResult::new("list");
        for app in apps {
            let row = json!({
                "app_id": app.cluster_id,
                "app_name": app.cluster_name,
                "idl_type": app.idl_type,
                "network_type": app.network_type,
                "vpc_id": app.vpc_id,
                "subnet_id": app.subnet_id,
                "create_time": app.created_time,
                "password_status": app.password_status,
                "api_access_id": app.api_access_id,
                "api_access_ip": app.api_access_ip,
                "api_access_port": app.api_access_port,
            });
            result.push(app.cluster_id.clone(), row);
        }
        Ok(result)
    }

    pub(super) async fn query_tcaplus_zones(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let app_id = required_str(resource, "app_id")?;
        let zone = input(resource, "zone_id").map(table_group_of).transpose()?;
        let zone_name = input(resource, "zone_name");

        let zone_ref = zone.as_deref();
        let zones = read_retry(|| async move {
            self.tcaplus()
                .describe_zones(app_id, zone_ref, zone_name)
                .await
        })
        .await?;

        let mut result = QueryResult::new("list");
        for zone in zones {
            let zone_id = zone_id_encode(app_id, &zone.table_group_id);
            let row = json!({
                "zone_id": zone_id,
                "zone_name": zone.table_group_name,
                "table_count": zone.table_count,
                "total_size": zone.total_size,
                "create_time": zone.created_time,
            });
            result.push(zone_id, row);
        }
        Ok(result)
    }

    pub(super) async fn query_tcaplus_tables(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let app_id = required_str(resource, "app_id")?;
        let zone = input(resource, "zone_id").map(table_group_of).transpose()?;
        let table_id = input(resource, "table_id");
        let table_name = input(resource, "table_name");

        let zone_ref = zone.as_deref();
        let tables = read_retry(|| async move {
            self.tcaplus()
                .describe_tables(app_id, zone_ref, table_id, table_name)
                .await
        })
        .await?;

        let mut result = QueryResult::new("list");
        for table in tables {
            let idl_id = match table.idl_files.first() {
                Some(file) => Some(
                    IdlId {
                        app_id: app_id.to_string(),
                        file_name: file.file_name.clone(),
                        file_type: file.file_type.clone(),
                        file_ext_type: file.file_ext_type.clone(),
                        file_size: file.file_size,
                        file_id: file.file_id.unwrap_or_default(),
                    }
                    .encode()?,
                ),
                None => None,
            };
            let error = table
                .error
                .as_ref()
                .filter(|e| !e.message.is_empty())
                .map(|e| format!("{}: {}", e.code, e.message));
            let row = json!({
                "table_id": table.table_instance_id,
                "table_name": table.table_name,
                "table_type": table.table_type,
                "zone_id": zone_id_encode(app_id, &table.table_group_id),
                "description": table.memo,
                "idl_id": idl_id,
                "table_idl_type": table.table_idl_type,
                "reserved_read_qps": table.reserved_read_qps,
                "reserved_write_qps": table.reserved_write_qps,
                "reserved_volume": table.reserved_volume,
                "table_size": table.table_size,
                "status": table.status,
                "create_time": table.created_time,
                "error": error,
            });
            result.push(table.table_instance_id.clone(), row);
        }
        Ok(result)
    }

    pub(super) async fn query_tcaplus_idls(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let app_id = required_str(resource, "app_id")?;

        let files = read_retry(|| async move { self.tcaplus().describe_idl_files(app_id).await }).await?;

        let mut result = QueryResult::new("list");
        for file in files {
            let idl_id = IdlId {
                app_id: app_id.to_string(),
                file_name: file.file_name,
                file_type: file.file_type,
                file_ext_type: file.file_ext_type,
                file_size: file.file_size,
                file_id: file.file_id.unwrap_or_default(),
            }
            .encode()?;
            result.push(idl_id.clone(), json!({ "idl_id": idl_id }));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_group_of() {
        assert_eq!(table_group_of("31xxx:2").unwrap(), "2");
        assert_eq!(table_group_of("2").unwrap(), "2");
        assert!(table_group_of("31xxx:").is_err());
    }
}
