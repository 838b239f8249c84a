use std::collections::HashMap;

use tccloud_core::provider::{ProviderError, ProviderResult};
use tccloud_core::resource::{AttributesExt, Resource, ResourceId, State, Value};
use tccloud_core::waiter::{
    CheckError, NotFound, Poll, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT, Waiter,
};

use super::{changed, observe, required_int, required_str, settled, tags_value, tolerate_not_found};
use crate::TencentCloudProvider;
use crate::helper::{attachment_id, parse_attachment_id};
use crate::services::cbs::{
    CreateDiskRequest, DISK_PENDING_STATES, DISK_STATE_ATTACHED, DISK_STATE_EXPANDING,
    DISK_STATE_ROLLBACKING, DISK_STATE_TORECYCLE, DISK_STATE_UNATTACHED, DiskChargePrepaid,
    Placement, SNAPSHOT_STATE_FAILED, SNAPSHOT_STATE_NORMAL,
};
use crate::services::{read_retry, tags_from_map, write_retry};

impl TencentCloudProvider {
    // ========== Disk Operations ==========

    pub(crate) async fn read_cbs_storage(&self, id: ResourceId, disk_id: &str) -> ProviderResult<State> {
        let disk = tolerate_not_found(
            read_retry(|| async move { self.cbs().describe_disk(disk_id).await }).await,
        )?;
        let Some(disk) = disk.filter(|d| d.disk_state != DISK_STATE_TORECYCLE) else {
            log::warn!("disk {} not found, clearing state", disk_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("storage_type".to_string(), Value::String(disk.disk_type));
        attributes.insert("storage_size".to_string(), Value::Int(disk.disk_size));
        attributes.insert("availability_zone".to_string(), Value::String(disk.placement.zone));
        attributes.insert("storage_name".to_string(), Value::String(disk.disk_name));
        if disk.disk_charge_type == "PREPAID" && !disk.renew_flag.is_empty() {
            attributes.insert("prepaid_renew_flag".to_string(), Value::String(disk.renew_flag));
        }
        attributes.insert("charge_type".to_string(), Value::String(disk.disk_charge_type));
        attributes.insert(
            "project_id".to_string(),
            Value::Int(disk.placement.project_id.unwrap_or(0) as i64),
        );
        attributes.insert("encrypt".to_string(), Value::Bool(disk.encrypt));
        attributes.insert(
            "throughput_performance".to_string(),
            Value::Int(disk.throughput_performance),
        );
        attributes.insert("tags".to_string(), tags_value(&disk.tags));
        attributes.insert("storage_status".to_string(), Value::String(disk.disk_state));
        attributes.insert("attached".to_string(), Value::Bool(disk.attached));

        Ok(State::existing(id, attributes).with_identifier(disk_id))
    }

    pub(crate) async fn create_cbs_storage(&self, resource: Resource) -> ProviderResult<State> {
        let attrs = &resource.attributes;
        let charge_type = attrs.string("charge_type").unwrap_or("POSTPAID_BY_HOUR");

        let disk_charge_prepaid = if charge_type == "PREPAID" {
            let period = attrs.int("prepaid_period").ok_or_else(|| {
                ProviderError::new("prepaid_period is required when charge_type is PREPAID")
                    .for_resource(resource.id.clone())
            })?;
            Some(DiskChargePrepaid {
                period,
                renew_flag: attrs.string("prepaid_renew_flag").map(String::from),
            })
        } else {
            None
        };

        let project_id = match attrs.int("project_id") {
            Some(project_id) => Some(u64::try_from(project_id).map_err(|_| {
                ProviderError::new(format!("invalid project_id {}", project_id))
                    .for_resource(resource.id.clone())
            })?),
            None => None,
        };

        let req = CreateDiskRequest {
            placement: Placement {
                zone: required_str(&resource, "availability_zone")?.to_string(),
                project_id,
            },
            disk_charge_type: charge_type.to_string(),
            disk_type: required_str(&resource, "storage_type")?.to_string(),
            disk_name: required_str(&resource, "storage_name")?.to_string(),
            disk_size: required_int(&resource, "storage_size")?,
            disk_count: 1,
            snapshot_id: attrs.string("snapshot_id").map(String::from),
            disk_charge_prepaid,
            encrypt: (attrs.bool("encrypt") == Some(true)).then(|| "ENCRYPT".to_string()),
            throughput_performance: attrs.int("throughput_performance"),
            tags: attrs
                .string_map("tags")
                .map(|t| tags_from_map(&t))
                .unwrap_or_default(),
        };

        let req = &req;
        let disk_id = write_retry(|| async move { self.cbs().create_disk(req).await }).await?;
        let disk_id = disk_id.as_str();
        log::info!("disk {} created", disk_id);

        Waiter::new(format!("disk {} to be created", disk_id))
            .timeout(READ_RETRY_TIMEOUT * 10)
            .until(|| async move {
                let disk = self.cbs().describe_disk(disk_id).await?;
                Ok::<_, CheckError>(match disk {
                    Some(d) if !DISK_PENDING_STATES.contains(&d.disk_state.as_str()) => {
                        Poll::Ready(())
                    }
                    Some(d) => Poll::Pending(d.disk_state),
                    None => Poll::Pending("NOT_FOUND".to_string()),
                })
            })
            .await?;

        let state = self.read_cbs_storage(resource.id.clone(), disk_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_cbs_storage(
        &self,
        id: ResourceId,
        disk_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let attrs = &to.attributes;

        let rename = changed(from, &to, "storage_name");
        let reproject = changed(from, &to, "project_id");
        if rename || reproject {
            let name = attrs.string("storage_name").filter(|_| rename);
            let project_id = attrs.int("project_id").filter(|_| reproject);
            write_retry(|| async move {
                self.cbs()
                    .modify_disk_attributes(disk_id, name, project_id)
                    .await
            })
            .await?;
        }

        if changed(from, &to, "storage_size") {
            let size = required_int(&to, "storage_size")?;
            if let Some(current) = from.attributes.int("storage_size")
                && size < current
            {
                return Err(ProviderError::new(format!(
                    "storage_size can only grow (current {} GB, requested {} GB)",
                    current, size
                ))
                .for_resource(id));
            }

            write_retry(|| async move { self.cbs().resize_disk(disk_id, size).await }).await?;
            Waiter::new(format!("disk {} to reach {} GB", disk_id, size))
                .timeout(WRITE_RETRY_TIMEOUT)
                .until(|| async move {
                    let disk = self.cbs().describe_disk(disk_id).await?;
                    let Some(disk) = disk else {
                        return Err(CheckError::Fatal(format!("disk {} disappeared", disk_id)));
                    };
                    Ok::<_, CheckError>(if disk.disk_size == size && disk.disk_state != DISK_STATE_EXPANDING {
                        Poll::Ready(())
                    } else {
                        Poll::Pending(disk.disk_state)
                    })
                })
                .await?;
        }

        if changed(from, &to, "snapshot_id")
            && let Some(snapshot_id) = attrs.string("snapshot_id")
        {
            write_retry(|| async move { self.cbs().apply_snapshot(disk_id, snapshot_id).await })
                .await?;
            Waiter::new(format!("disk {} to roll back to {}", disk_id, snapshot_id))
                .timeout(WRITE_RETRY_TIMEOUT)
                .until(|| async move {
                    let disk = self.cbs().describe_disk(disk_id).await?;
                    Ok::<_, CheckError>(match disk {
                        Some(d) if d.disk_state == DISK_STATE_ROLLBACKING => {
                            Poll::Pending(d.disk_state)
                        }
                        Some(_) => Poll::Ready(()),
                        None => Poll::Pending("NOT_FOUND".to_string()),
                    })
                })
                .await?;
        }

        if changed(from, &to, "throughput_performance")
            && let Some(throughput) = attrs.int("throughput_performance")
        {
            write_retry(|| async move {
                self.cbs()
                    .modify_throughput_performance(disk_id, throughput)
                    .await
            })
            .await?;
        }

        let state = self.read_cbs_storage(id, disk_id).await?;
        settled(state, &to)
    }

    pub(crate) async fn delete_cbs_storage(&self, disk_id: &str, from: &State) -> ProviderResult<()> {
        match write_retry(|| async move { self.cbs().terminate_disk(disk_id).await }).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        let status = self
            .wait_disk_gone(disk_id, &[DISK_STATE_TORECYCLE])
            .await?;

        if from.attributes.bool("force_delete") == Some(true)
            && status.as_deref() == Some(DISK_STATE_TORECYCLE)
        {
            log::info!("disk {} is in the recycle bin, deleting it for good", disk_id);
            write_retry(|| async move { self.cbs().terminate_disk(disk_id).await }).await?;
            self.wait_disk_gone(disk_id, &[]).await?;
        }
        Ok(())
    }

    /// Wait until the disk is gone or reaches one of `success`
    async fn wait_disk_gone(&self, disk_id: &str, success: &[&str]) -> ProviderResult<Option<String>> {
        let status = Waiter::new(format!("disk {} to be deleted", disk_id))
            .timeout(WRITE_RETRY_TIMEOUT)
            .success(success)
            .not_found(NotFound::Success)
            .until_status(|| async move {
                let disk = tolerate_not_found(self.cbs().describe_disk(disk_id).await)?;
                Ok::<_, CheckError>(observe(disk, |d| d.disk_state))
            })
            .await?;
        Ok(status)
    }

    // ========== Disk Attachment Operations ==========

    pub(crate) async fn read_cbs_storage_attachment(
        &self,
        id: ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let (instance_id, disk_id) = parse_attachment_id(identifier)?;
        let disk_ref = disk_id.as_str();
        let disk = tolerate_not_found(
            read_retry(|| async move { self.cbs().describe_disk(disk_ref).await }).await,
        )?;

        match disk {
            Some(disk) if disk.attached && disk.instance_id == instance_id => {
                let mut attributes = HashMap::new();
                attributes.insert("storage_id".to_string(), Value::String(disk_id));
                attributes.insert("instance_id".to_string(), Value::String(instance_id));
                Ok(State::existing(id, attributes).with_identifier(identifier))
            }
            _ => {
                log::warn!("attachment {} not found, clearing state", identifier);
                Ok(State::not_found(id))
            }
        }
    }

    pub(crate) async fn create_cbs_storage_attachment(&self, resource: Resource) -> ProviderResult<State> {
        let disk_id = required_str(&resource, "storage_id")?;
        let instance_id = required_str(&resource, "instance_id")?;

        write_retry(|| async move { self.cbs().attach_disk(disk_id, instance_id).await }).await?;
        Waiter::new(format!("disk {} to attach to {}", disk_id, instance_id))
            .timeout(WRITE_RETRY_TIMEOUT)
            .success(&[DISK_STATE_ATTACHED])
            .not_found(NotFound::Fail)
            .until_status(|| async move {
                let disk = self.cbs().describe_disk(disk_id).await?;
                Ok::<_, CheckError>(observe(disk, |d| d.disk_state))
            })
            .await?;

        let identifier = attachment_id(instance_id, disk_id);
        let state = self
            .read_cbs_storage_attachment(resource.id.clone(), &identifier)
            .await?;
        settled(state, &resource)
    }

    pub(crate) async fn delete_cbs_storage_attachment(&self, identifier: &str) -> ProviderResult<()> {
        let (instance_id, disk_id) = parse_attachment_id(identifier)?;
        let (instance_id, disk_id) = (instance_id.as_str(), disk_id.as_str());

        match write_retry(|| async move { self.cbs().detach_disk(disk_id, instance_id).await }).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        Waiter::new(format!("disk {} to detach", disk_id))
            .timeout(WRITE_RETRY_TIMEOUT)
            .success(&[DISK_STATE_UNATTACHED])
            .not_found(NotFound::Success)
            .until_status(|| async move {
                let disk = tolerate_not_found(self.cbs().describe_disk(disk_id).await)?;
                Ok::<_, CheckError>(observe(disk, |d| d.disk_state))
            })
            .await?;
        Ok(())
    }

    // ========== Snapshot Operations ==========

    pub(crate) async fn read_cbs_snapshot(&self, id: ResourceId, snapshot_id: &str) -> ProviderResult<State> {
        let snapshot = tolerate_not_found(
            read_retry(|| async move { self.cbs().describe_snapshot(snapshot_id).await }).await,
        )?;
        let Some(snapshot) = snapshot else {
            log::warn!("snapshot {} not found, clearing state", snapshot_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("storage_id".to_string(), Value::String(snapshot.disk_id));
        attributes.insert("snapshot_name".to_string(), Value::String(snapshot.snapshot_name));
        attributes.insert(
            "snapshot_status".to_string(),
            Value::String(snapshot.snapshot_state),
        );
        attributes.insert("storage_size".to_string(), Value::Int(snapshot.disk_size));
        attributes.insert("create_time".to_string(), Value::String(snapshot.create_time));
        attributes.insert("percent".to_string(), Value::Int(snapshot.percent));

        Ok(State::existing(id, attributes).with_identifier(snapshot_id))
    }

    pub(crate) async fn create_cbs_snapshot(&self, resource: Resource) -> ProviderResult<State> {
        let disk_id = required_str(&resource, "storage_id")?;
        let name = required_str(&resource, "snapshot_name")?;

        let snapshot_id =
            write_retry(|| async move { self.cbs().create_snapshot(disk_id, name).await }).await?;
        let snapshot_id = snapshot_id.as_str();

        Waiter::new(format!("snapshot {} to complete", snapshot_id))
            .timeout(WRITE_RETRY_TIMEOUT)
            .success(&[SNAPSHOT_STATE_NORMAL])
            .failure(&[SNAPSHOT_STATE_FAILED])
            .not_found(NotFound::Retry)
            .until_status(|| async move {
                let snapshot = self.cbs().describe_snapshot(snapshot_id).await?;
                Ok::<_, CheckError>(observe(snapshot, |s| s.snapshot_state))
            })
            .await?;

        let state = self.read_cbs_snapshot(resource.id.clone(), snapshot_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_cbs_snapshot(
        &self,
        id: ResourceId,
        snapshot_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        if changed(from, &to, "snapshot_name") {
            let name = required_str(&to, "snapshot_name")?;
            write_retry(|| async move { self.cbs().modify_snapshot_name(snapshot_id, name).await })
                .await?;
        }
        self.read_cbs_snapshot(id, snapshot_id).await
    }

    pub(crate) async fn delete_cbs_snapshot(&self, snapshot_id: &str) -> ProviderResult<()> {
        match self.cbs().delete_snapshot(snapshot_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        Waiter::new(format!("snapshot {} to be deleted", snapshot_id))
            .timeout(WRITE_RETRY_TIMEOUT)
            .not_found(NotFound::Success)
            .until_status(|| async move {
                let snapshot = tolerate_not_found(self.cbs().describe_snapshot(snapshot_id).await)?;
                Ok::<_, CheckError>(observe(snapshot, |s| s.snapshot_state))
            })
            .await?;
        Ok(())
    }
}
