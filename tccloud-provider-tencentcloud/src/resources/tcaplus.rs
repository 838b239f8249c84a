use std::collections::HashMap;

use serde_json::json;
use tccloud_core::provider::{ProviderError, ProviderResult};
use tccloud_core::resource::{AttributesExt, Resource, ResourceId, State, Value};
use tccloud_core::waiter::{
    CheckError, NotFound, Poll, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT, Waiter,
};

use super::{
    changed, deleted, insert_non_empty, observe, required_int, required_str, settled,
    tolerate_not_found, wait_visible,
};
use crate::TencentCloudProvider;
use crate::services::tcaplus::{
    IdlFileInfo, IdlId, ParsedTableInfo, SelectedTable, TASK_DONE_PROGRESS, TableInfo,
    encode_idl_content, table_id_decode, table_id_encode, zone_id_decode, zone_id_encode,
};
use crate::services::{read_retry, write_retry};

fn parsed_tables_value(tables: &[ParsedTableInfo]) -> Value {
    let list: Vec<serde_json::Value> = tables
        .iter()
        .map(|t| {
            json!({
                "table_name": t.table_name,
                "table_idl_type": t.table_idl_type,
                "table_type": t.table_type,
                "key_fields": t.key_fields,
                "value_fields": t.value_fields,
                "sum_key_field_size": t.sum_key_field_size,
                "sum_value_field_size": t.sum_value_field_size,
                "index_key_set": t.index_key_set,
                "sharding_key_set": t.sharding_key_set,
            })
        })
        .collect();
    Value::from_json(&serde_json::Value::Array(list)).unwrap_or(Value::List(Vec::new()))
}

/// The IDL file a table was last created or altered with
fn table_idl_id(app_id: &str, table: &TableInfo) -> ProviderResult<Option<String>> {
    let Some(file) = table.idl_files.first() else {
        return Ok(None);
    };
    let idl = IdlId {
        app_id: app_id.to_string(),
        file_name: file.file_name.clone(),
        file_type: file.file_type.clone(),
        file_ext_type: file.file_ext_type.clone(),
        file_size: file.file_size,
        file_id: file.file_id.unwrap_or_default(),
    };
    Ok(Some(idl.encode()?))
}

impl TencentCloudProvider {
    // ========== Application Operations ==========

    pub(crate) async fn read_tcaplus_application(&self, id: ResourceId, app_id: &str) -> ProviderResult<State> {
        let app = tolerate_not_found(
            read_retry(|| async move { self.tcaplus().describe_app(app_id).await }).await,
        )?;
        let Some(app) = app else {
            log::warn!("tcaplus application {} not found, clearing state", app_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("idl_type".to_string(), Value::String(app.idl_type));
        attributes.insert("app_name".to_string(), Value::String(app.cluster_name));
        attributes.insert("vpc_id".to_string(), Value::String(app.vpc_id));
        attributes.insert("subnet_id".to_string(), Value::String(app.subnet_id));
        attributes.insert("network_type".to_string(), Value::String(app.network_type));
        attributes.insert("create_time".to_string(), Value::String(app.created_time));
        attributes.insert("password_status".to_string(), Value::String(app.password_status));
        attributes.insert("api_access_id".to_string(), Value::String(app.api_access_id));
        attributes.insert("api_access_ip".to_string(), Value::String(app.api_access_ip));
        attributes.insert("api_access_port".to_string(), Value::Int(app.api_access_port));

        Ok(State::existing(id, attributes).with_identifier(app_id))
    }

    pub(crate) async fn create_tcaplus_application(&self, resource: Resource) -> ProviderResult<State> {
        let idl_type = required_str(&resource, "idl_type")?;
        let app_name = required_str(&resource, "app_name")?;
        let vpc_id = required_str(&resource, "vpc_id")?;
        let subnet_id = required_str(&resource, "subnet_id")?;
        let password = required_str(&resource, "password")?;

        let app_id = write_retry(|| async move {
            self.tcaplus()
                .create_app(idl_type, app_name, vpc_id, subnet_id, password)
                .await
        })
        .await?;
        let app_id = app_id.as_str();
        log::info!("tcaplus application {} created", app_id);

        wait_visible(format!("tcaplus application {} to be visible", app_id), || async move {
            self.tcaplus().describe_app(app_id).await
        })
        .await?;

        let state = self.read_tcaplus_application(resource.id.clone(), app_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_tcaplus_application(
        &self,
        id: ResourceId,
        app_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        if changed(from, &to, "app_name") {
            let app_name = required_str(&to, "app_name")?;
            write_retry(|| async move { self.tcaplus().modify_app_name(app_id, app_name).await })
                .await?;
        }

        if changed(from, &to, "password") {
            let new_password = required_str(&to, "password")?;
            let old_password = from.attributes.string("password").ok_or_else(|| {
                ProviderError::new("the current password is not in the prior state")
                    .for_resource(id.clone())
            })?;
            let expire_last = to.attributes.int("old_password_expire_last").unwrap_or(3600);
            write_retry(|| async move {
                self.tcaplus()
                    .modify_app_password(app_id, old_password, new_password, expire_last)
                    .await
            })
            .await?;
        }

        let state = self.read_tcaplus_application(id, app_id).await?;
        settled(state, &to)
    }

    pub(crate) async fn delete_tcaplus_application(&self, app_id: &str) -> ProviderResult<()> {
        let task_id = match write_retry(|| async move { self.tcaplus().delete_app(app_id).await }).await {
            Ok(task_id) => task_id,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        self.wait_tcaplus_task(app_id, &task_id).await
    }

    /// Wait until a background task finishes or is no longer reported
    async fn wait_tcaplus_task(&self, app_id: &str, task_id: &str) -> ProviderResult<()> {
        if task_id.is_empty() {
            return Ok(());
        }
        Waiter::new(format!("tcaplus task {} to finish", task_id))
            .timeout(READ_RETRY_TIMEOUT * 10)
            .until(|| async move {
                let task = tolerate_not_found(self.tcaplus().describe_task(app_id, task_id).await)?;
                Ok::<_, CheckError>(match task {
                    Some(task) if task.progress < TASK_DONE_PROGRESS => {
                        Poll::Pending(format!("{}%", task.progress))
                    }
                    _ => Poll::Ready(()),
                })
            })
            .await?;
        Ok(())
    }

    // ========== Zone Operations ==========

    pub(crate) async fn read_tcaplus_zone(&self, id: ResourceId, identifier: &str) -> ProviderResult<State> {
        let (app_id, zone_id) = zone_id_decode(identifier)?;
        let (app, zone) = (app_id.as_str(), zone_id.as_str());
        let info = tolerate_not_found(
            read_retry(|| async move { self.tcaplus().describe_zone(app, zone).await }).await,
        )?;
        let Some(info) = info else {
            log::warn!("tcaplus zone {} not found, clearing state", identifier);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("app_id".to_string(), Value::String(app_id.clone()));
        attributes.insert("zone_name".to_string(), Value::String(info.table_group_name));
        attributes.insert("table_count".to_string(), Value::Int(info.table_count));
        attributes.insert("total_size".to_string(), Value::Int(info.total_size));
        attributes.insert("create_time".to_string(), Value::String(info.created_time));

        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    pub(crate) async fn create_tcaplus_zone(&self, resource: Resource) -> ProviderResult<State> {
        let app_id = required_str(&resource, "app_id")?;
        let zone_name = required_str(&resource, "zone_name")?;

        let zone_id =
            write_retry(|| async move { self.tcaplus().create_zone(app_id, zone_name).await }).await?;
        let identifier = zone_id_encode(app_id, &zone_id);
        log::info!("tcaplus zone {} created", identifier);

        let state = self.read_tcaplus_zone(resource.id.clone(), &identifier).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_tcaplus_zone(
        &self,
        id: ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        if changed(from, &to, "zone_name") {
            let (app_id, zone_id) = zone_id_decode(identifier)?;
            let (app, zone) = (app_id.as_str(), zone_id.as_str());
            let zone_name = required_str(&to, "zone_name")?;
            write_retry(|| async move { self.tcaplus().modify_zone_name(app, zone, zone_name).await })
                .await?;
        }
        self.read_tcaplus_zone(id, identifier).await
    }

    pub(crate) async fn delete_tcaplus_zone(&self, identifier: &str) -> ProviderResult<()> {
        let (app_id, zone_id) = zone_id_decode(identifier)?;
        let (app, zone) = (app_id.as_str(), zone_id.as_str());
        deleted(write_retry(|| async move { self.tcaplus().delete_zone(app, zone).await }).await)
    }

    // ========== IDL Operations ==========

    pub(crate) async fn read_tcaplus_idl(&self, id: ResourceId, identifier: &str) -> ProviderResult<State> {
        let idl = IdlId::decode(identifier)?;
        let idl_ref = &idl;
        let tables = tolerate_not_found(
            read_retry(|| async move { self.tcaplus().describe_idl_tables(idl_ref).await }).await,
        )?;
        let Some(tables) = tables else {
            log::warn!("tcaplus idl {} not found, clearing state", idl.file_name);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("app_id".to_string(), Value::String(idl.app_id));
        attributes.insert("file_name".to_string(), Value::String(idl.file_name));
        attributes.insert("file_type".to_string(), Value::String(idl.file_type));
        attributes.insert("file_ext_type".to_string(), Value::String(idl.file_ext_type));
        attributes.insert("table_infos".to_string(), parsed_tables_value(&tables));

        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    pub(crate) async fn create_tcaplus_idl(&self, resource: Resource) -> ProviderResult<State> {
        let app_id = required_str(&resource, "app_id")?;
        let (zone_app, table_group_id) = zone_id_decode(required_str(&resource, "zone_id")?)?;
        if zone_app != app_id {
            return Err(ProviderError::new(format!(
                "zone {} does not belong to application {}",
                table_group_id, app_id
            ))
            .for_resource(resource.id.clone()));
        }
        let content = required_str(&resource, "file_content")?;
        let file = IdlFileInfo {
            file_name: required_str(&resource, "file_name")?.to_string(),
            file_type: required_str(&resource, "file_type")?.to_string(),
            file_ext_type: required_str(&resource, "file_ext_type")?.to_string(),
            file_size: content.len() as i64,
            file_id: None,
            file_content: Some(encode_idl_content(content)),
        };

        let (file, group) = (&file, table_group_id.as_str());
        let (file_id, tables) = write_retry(|| async move {
            self.tcaplus()
                .verify_new_idl(app_id, group, file.clone())
                .await
        })
        .await?;

        if let Some(error) = tables
            .iter()
            .filter_map(|t| t.error.as_ref())
            .find(|e| !e.code.is_empty() || !e.message.is_empty())
        {
            return Err(ProviderError::new(format!(
                "IDL file {} does not parse: {} {}",
                file.file_name, error.code, error.message
            ))
            .with_code(error.code.clone())
            .for_resource(resource.id.clone()));
        }

        let identifier = IdlId {
            app_id: app_id.to_string(),
            file_name: file.file_name.clone(),
            file_type: file.file_type.clone(),
            file_ext_type: file.file_ext_type.clone(),
            file_size: file.file_size,
            file_id,
        }
        .encode()?;
        log::info!("tcaplus idl {} uploaded as file {}", file.file_name, file_id);

        let state = self.read_tcaplus_idl(resource.id.clone(), &identifier).await?;
        settled(state, &resource)
    }

    pub(crate) async fn delete_tcaplus_idl(&self, identifier: &str) -> ProviderResult<()> {
        let idl = IdlId::decode(identifier)?;
        let idl = &idl;
        deleted(write_retry(|| async move { self.tcaplus().delete_idl(idl).await }).await)
    }

    // ========== Table Operations ==========

    pub(crate) async fn read_tcaplus_table(&self, id: ResourceId, identifier: &str) -> ProviderResult<State> {
        let (app_id, table_id) = table_id_decode(identifier)?;
        let (app, table_ref) = (app_id.as_str(), table_id.as_str());
        let table = tolerate_not_found(
            read_retry(|| async move { self.tcaplus().describe_table(app, table_ref).await }).await,
        )?;
        let Some(table) = table else {
            log::warn!("tcaplus table {} not found, clearing state", identifier);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        if let Some(idl_id) = table_idl_id(app, &table)? {
            attributes.insert("idl_id".to_string(), Value::String(idl_id));
        }
        attributes.insert("app_id".to_string(), Value::String(app_id.clone()));
        attributes.insert(
            "zone_id".to_string(),
            Value::String(zone_id_encode(app, &table.table_group_id)),
        );
        attributes.insert("table_name".to_string(), Value::String(table.table_name));
        attributes.insert("table_type".to_string(), Value::String(table.table_type));
        insert_non_empty(&mut attributes, "description", &table.memo);
        attributes.insert("table_idl_type".to_string(), Value::String(table.table_idl_type));
        attributes.insert("reserved_read_qps".to_string(), Value::Int(table.reserved_read_qps));
        attributes.insert("reserved_write_qps".to_string(), Value::Int(table.reserved_write_qps));
        attributes.insert("reserved_volume".to_string(), Value::Int(table.reserved_volume));
        attributes.insert("table_size".to_string(), Value::Int(table.table_size));
        attributes.insert("status".to_string(), Value::String(table.status));
        attributes.insert("create_time".to_string(), Value::String(table.created_time));
        if let Some(error) = table.error.filter(|e| !e.message.is_empty()) {
            attributes.insert(
                "error".to_string(),
                Value::String(format!("{}: {}", error.code, error.message)),
            );
        }

        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    pub(crate) async fn create_tcaplus_table(&self, resource: Resource) -> ProviderResult<State> {
        let app_id = required_str(&resource, "app_id")?;
        let (_, table_group_id) = zone_id_decode(required_str(&resource, "zone_id")?)?;
        let idl = IdlId::decode(required_str(&resource, "idl_id")?)?;
        if idl.app_id != app_id {
            return Err(ProviderError::new(format!(
                "idl file {} does not belong to application {}",
                idl.file_name, app_id
            ))
            .for_resource(resource.id.clone()));
        }

        let table = SelectedTable {
            table_group_id: table_group_id.clone(),
            table_name: required_str(&resource, "table_name")?.to_string(),
            table_instance_id: None,
            table_idl_type: Some(required_str(&resource, "table_idl_type")?.to_string()),
            table_type: Some(required_str(&resource, "table_type")?.to_string()),
            reserved_read_qps: Some(required_int(&resource, "reserved_read_qps")?),
            reserved_write_qps: Some(required_int(&resource, "reserved_write_qps")?),
            reserved_volume: Some(required_int(&resource, "reserved_volume")?),
            memo: resource.attributes.string("description").map(String::from),
        };

        let (idl, table) = (&idl, &table);
        let (task_id, table_id) = write_retry(|| async move {
            self.tcaplus().create_table(idl, table.clone()).await
        })
        .await?;
        if table_id.is_empty() {
            return Err(ProviderError::new("CreateTables returned no TableInstanceId")
                .for_resource(resource.id.clone()));
        }
        log::info!("tcaplus table {} creating with task {}", table_id, task_id);

        self.wait_tcaplus_task(app_id, &task_id).await?;

        let table_ref = table_id.as_str();
        wait_visible(format!("tcaplus table {} to be visible", table_id), || async move {
            self.tcaplus().describe_table(app_id, table_ref).await
        })
        .await?;

        let identifier = table_id_encode(app_id, &table_id);
        let state = self.read_tcaplus_table(resource.id.clone(), &identifier).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_tcaplus_table(
        &self,
        id: ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let (app_id, table_id) = table_id_decode(identifier)?;
        let (_, table_group_id) = zone_id_decode(required_str(&to, "zone_id")?)?;
        let selected = SelectedTable {
            table_group_id,
            table_name: required_str(&to, "table_name")?.to_string(),
            table_instance_id: Some(table_id.clone()),
            ..Default::default()
        };
        let app = app_id.as_str();

        if changed(from, &to, "description") {
            let memo = SelectedTable {
                memo: Some(to.attributes.string("description").unwrap_or_default().to_string()),
                ..selected.clone()
            };
            let memo = &memo;
            write_retry(|| async move { self.tcaplus().modify_table_memo(app, memo.clone()).await })
                .await?;
        }

        if changed(from, &to, "idl_id") {
            let idl = IdlId::decode(required_str(&to, "idl_id")?)?;
            let altered = SelectedTable {
                table_idl_type: to.attributes.string("table_idl_type").map(String::from),
                table_type: to.attributes.string("table_type").map(String::from),
                ..selected.clone()
            };
            let (idl, altered) = (&idl, &altered);
            let task_id = write_retry(|| async move {
                self.tcaplus().modify_table_idl(idl, altered.clone()).await
            })
            .await?;
            self.wait_tcaplus_task(app, &task_id).await?;
        }

        let state = self.read_tcaplus_table(id, identifier).await?;
        settled(state, &to)
    }

    pub(crate) async fn delete_tcaplus_table(&self, identifier: &str) -> ProviderResult<()> {
        let (app_id, table_id) = table_id_decode(identifier)?;
        let (app, table_ref) = (app_id.as_str(), table_id.as_str());

        let table = tolerate_not_found(
            read_retry(|| async move { self.tcaplus().describe_table(app, table_ref).await }).await,
        )?;
        let Some(table) = table else {
            return Ok(());
        };
        let selected = SelectedTable {
            table_group_id: table.table_group_id,
            table_name: table.table_name,
            table_instance_id: Some(table_id.clone()),
            ..Default::default()
        };

        let selected = &selected;
        let task_id = match write_retry(|| async move {
            self.tcaplus().delete_table(app, selected.clone()).await
        })
        .await
        {
            Ok(task_id) => task_id,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        self.wait_tcaplus_task(app, &task_id).await?;

        Waiter::new(format!("tcaplus table {} to be deleted", table_id))
            .timeout(WRITE_RETRY_TIMEOUT)
            .not_found(NotFound::Success)
            .until_status(|| async move {
                let table = tolerate_not_found(self.tcaplus().describe_table(app, table_ref).await)?;
                Ok::<_, CheckError>(observe(table, |t| t.status))
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tcaplus::ErrorInfo;

    #[test]
    fn test_parsed_tables_value() {
        let tables = vec![ParsedTableInfo {
            table_name: "tb_online".to_string(),
            table_type: "GENERIC".to_string(),
            key_fields: "uin".to_string(),
            sum_key_field_size: 8,
            error: Some(ErrorInfo::default()),
            ..Default::default()
        }];
        let value = parsed_tables_value(&tables);
        let list = value.as_list().unwrap();
        assert_eq!(list.len(), 1);
        let table = list[0].as_map().unwrap();
        assert_eq!(table.get("table_name"), Some(&Value::from("tb_online")));
        assert_eq!(table.get("sum_key_field_size"), Some(&Value::Int(8)));
    }

    #[test]
    fn test_table_idl_id_uses_first_file() {
        let table = TableInfo {
            idl_files: vec![IdlFileInfo {
                file_name: "tb_online".to_string(),
                file_type: "PROTO".to_string(),
                file_ext_type: "proto".to_string(),
                file_size: 120,
                file_id: Some(7),
                file_content: None,
            }],
            ..Default::default()
        };
        let encoded = table_idl_id("app-1", &table).unwrap().unwrap();
        let idl = IdlId::decode(&encoded).unwrap();
        assert_eq!(idl.app_id, "app-1");
        assert_eq!(idl.file_id, 7);

        assert!(table_idl_id("app-1", &TableInfo::default()).unwrap().is_none());
    }
}
