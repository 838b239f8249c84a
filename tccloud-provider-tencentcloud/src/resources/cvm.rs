use std::collections::HashMap;

use tccloud_core::provider::{ProviderError, ProviderResult};
use tccloud_core::resource::{AttributesExt, Resource, ResourceId, State, Value};
use tccloud_core::waiter::{CheckError, NotFound, WRITE_RETRY_TIMEOUT, Waiter};

use super::{changed, observe, required_str, settled, tags_value, tolerate_not_found};
use crate::TencentCloudProvider;
use crate::schemas::cvm::DEFAULT_INSTANCE_NAME;
use crate::services::cvm::{
    INSTANCE_STATUS_LAUNCH_FAILED, INSTANCE_STATUS_RUNNING, INSTANCE_STATUS_STOPPED,
    InternetAccessible, LoginSettings, Placement, RunInstancesRequest, SystemDisk,
    TagSpecification, VirtualPrivateCloud,
};
use crate::services::{read_retry, tags_from_map, write_retry};

impl TencentCloudProvider {
    // ========== Instance Operations ==========

    pub(crate) async fn read_instance(&self, id: ResourceId, instance_id: &str) -> ProviderResult<State> {
        let instance = tolerate_not_found(
            read_retry(|| async move { self.cvm().describe_instance(instance_id).await }).await,
        )?;
        let Some(instance) =
            instance.filter(|i| i.instance_state != INSTANCE_STATUS_LAUNCH_FAILED)
        else {
            log::warn!("instance {} not found, clearing state", instance_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("image_id".to_string(), Value::String(instance.image_id));
        attributes.insert(
            "availability_zone".to_string(),
            Value::String(instance.placement.zone),
        );
        attributes.insert("instance_type".to_string(), Value::String(instance.instance_type));
        attributes.insert("instance_name".to_string(), Value::String(instance.instance_name));
        attributes.insert(
            "instance_charge_type".to_string(),
            Value::String(instance.instance_charge_type),
        );
        if !instance.virtual_private_cloud.vpc_id.is_empty() {
            attributes.insert(
                "vpc_id".to_string(),
                Value::String(instance.virtual_private_cloud.vpc_id),
            );
            attributes.insert(
                "subnet_id".to_string(),
                Value::String(instance.virtual_private_cloud.subnet_id),
            );
        }
        attributes.insert(
            "security_groups".to_string(),
            Value::from(instance.security_group_ids),
        );
        if let Some(disk_type) = instance.system_disk.disk_type {
            attributes.insert("system_disk_type".to_string(), Value::String(disk_type));
        }
        if let Some(disk_size) = instance.system_disk.disk_size {
            attributes.insert("system_disk_size".to_string(), Value::Int(disk_size));
        }
        if let Some(bandwidth) = instance.internet_accessible.internet_max_bandwidth_out {
            attributes.insert("internet_max_bandwidth_out".to_string(), Value::Int(bandwidth));
        }
        if let Some(assigned) = instance.internet_accessible.public_ip_assigned {
            attributes.insert("allocate_public_ip".to_string(), Value::Bool(assigned));
        }
        attributes.insert(
            "project_id".to_string(),
            Value::Int(instance.placement.project_id.unwrap_or(0)),
        );
        attributes.insert(
            "running_flag".to_string(),
            Value::Bool(instance.instance_state != INSTANCE_STATUS_STOPPED),
        );
        attributes.insert("tags".to_string(), tags_value(&instance.tags));
        attributes.insert(
            "instance_status".to_string(),
            Value::String(instance.instance_state),
        );
        if let Some(ip) = instance.private_ip_addresses.first() {
            attributes.insert("private_ip".to_string(), Value::String(ip.clone()));
        }
        if let Some(ip) = instance.public_ip_addresses.first() {
            attributes.insert("public_ip".to_string(), Value::String(ip.clone()));
        }
        attributes.insert("create_time".to_string(), Value::String(instance.created_time));
        attributes.insert("expired_time".to_string(), Value::String(instance.expired_time));

        Ok(State::existing(id, attributes).with_identifier(instance_id))
    }

    pub(crate) async fn create_instance(&self, resource: Resource) -> ProviderResult<State> {
        let attrs = &resource.attributes;

        let virtual_private_cloud = match (attrs.string("vpc_id"), attrs.string("subnet_id")) {
            (Some(vpc_id), Some(subnet_id)) => Some(VirtualPrivateCloud {
                vpc_id: vpc_id.to_string(),
                subnet_id: subnet_id.to_string(),
            }),
            (None, None) => None,
            _ => {
                return Err(
                    ProviderError::new("vpc_id and subnet_id must be set together")
                        .for_resource(resource.id.clone()),
                );
            }
        };

        let system_disk_type = attrs.string("system_disk_type").map(String::from);
        let system_disk_size = attrs.int("system_disk_size");
        let bandwidth = attrs.int("internet_max_bandwidth_out");
        let public_ip = attrs.bool("allocate_public_ip");
        let tags = attrs
            .string_map("tags")
            .map(|t| tags_from_map(&t))
            .unwrap_or_default();

        let req = RunInstancesRequest {
            instance_charge_type: attrs
                .string("instance_charge_type")
                .unwrap_or("POSTPAID_BY_HOUR")
                .to_string(),
            placement: Placement {
                zone: required_str(&resource, "availability_zone")?.to_string(),
                project_id: attrs.int("project_id"),
            },
            instance_type: required_str(&resource, "instance_type")?.to_string(),
            image_id: required_str(&resource, "image_id")?.to_string(),
            instance_count: 1,
            instance_name: attrs
                .string("instance_name")
                .unwrap_or(DEFAULT_INSTANCE_NAME)
                .to_string(),
            system_disk: (system_disk_type.is_some() || system_disk_size.is_some()).then_some(
                SystemDisk {
                    disk_type: system_disk_type,
                    disk_size: system_disk_size,
                },
            ),
            virtual_private_cloud,
            internet_accessible: (bandwidth.is_some() || public_ip.is_some()).then_some(
                InternetAccessible {
                    internet_max_bandwidth_out: bandwidth,
                    public_ip_assigned: public_ip,
                },
            ),
            login_settings: attrs.string("password").map(|password| LoginSettings {
                password: password.to_string(),
            }),
            security_group_ids: attrs.string_list("security_groups").unwrap_or_default(),
            host_name: attrs.string("hostname").map(String::from),
            tag_specification: if tags.is_empty() {
                Vec::new()
            } else {
                vec![TagSpecification {
                    resource_type: "instance".to_string(),
                    tags,
                }]
            },
        };

        let req = &req;
        let instance_id = write_retry(|| async move { self.cvm().run_instance(req).await }).await?;
        let instance_id = instance_id.as_str();
        log::info!("instance {} launched", instance_id);

        self.wait_instance_status(instance_id, INSTANCE_STATUS_RUNNING)
            .await?;

        if attrs.bool("running_flag") == Some(false) {
            write_retry(|| async move { self.cvm().stop_instance(instance_id).await }).await?;
            self.wait_instance_status(instance_id, INSTANCE_STATUS_STOPPED)
                .await?;
        }

        let state = self.read_instance(resource.id.clone(), instance_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_instance(
        &self,
        id: ResourceId,
        instance_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let attrs = &to.attributes;

        let rename = changed(from, &to, "instance_name");
        let regroup = changed(from, &to, "security_groups");
        if rename || regroup {
            let name = attrs.string("instance_name").filter(|_| rename);
            let groups = attrs.string_list("security_groups").filter(|_| regroup);
            let groups = groups.as_deref();
            write_retry(|| async move {
                self.cvm()
                    .modify_instance_attribute(instance_id, name, groups)
                    .await
            })
            .await?;
        }

        if changed(from, &to, "project_id")
            && let Some(project_id) = attrs.int("project_id")
        {
            write_retry(|| async move { self.cvm().modify_project_id(instance_id, project_id).await })
                .await?;
        }

        let running = attrs.bool("running_flag").unwrap_or(true);

        if changed(from, &to, "instance_type") {
            let instance_type = required_str(&to, "instance_type")?;
            write_retry(|| async move {
                self.cvm()
                    .reset_instance_type(instance_id, instance_type)
                    .await
            })
            .await?;
            self.wait_instance_status(instance_id, INSTANCE_STATUS_RUNNING)
                .await?;
        }

        if changed(from, &to, "password")
            && let Some(password) = attrs.string("password")
        {
            write_retry(|| async move {
                self.cvm()
                    .reset_instance_password(instance_id, password)
                    .await
            })
            .await?;
            let settled_status = if from.attributes.bool("running_flag") == Some(false) {
                INSTANCE_STATUS_STOPPED
            } else {
                INSTANCE_STATUS_RUNNING
            };
            self.wait_instance_status(instance_id, settled_status).await?;
        }

        if changed(from, &to, "running_flag") {
            if running {
                write_retry(|| async move { self.cvm().start_instance(instance_id).await }).await?;
                self.wait_instance_status(instance_id, INSTANCE_STATUS_RUNNING)
                    .await?;
            } else {
                write_retry(|| async move { self.cvm().stop_instance(instance_id).await }).await?;
                self.wait_instance_status(instance_id, INSTANCE_STATUS_STOPPED)
                    .await?;
            }
        }

        let state = self.read_instance(id, instance_id).await?;
        settled(state, &to)
    }

    pub(crate) async fn delete_instance(&self, instance_id: &str) -> ProviderResult<()> {
        match write_retry(|| async move { self.cvm().terminate_instance(instance_id).await }).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        Waiter::new(format!("instance {} to terminate", instance_id))
            .timeout(WRITE_RETRY_TIMEOUT)
            .not_found(NotFound::Success)
            .until_status(|| async move {
                let instance =
                    tolerate_not_found(self.cvm().describe_instance(instance_id).await)?;
                Ok::<_, CheckError>(observe(instance, |i| i.instance_state))
            })
            .await?;
        Ok(())
    }

    async fn wait_instance_status(&self, instance_id: &str, status: &str) -> ProviderResult<()> {
        Waiter::new(format!("instance {} to be {}", instance_id, status))
            .timeout(WRITE_RETRY_TIMEOUT)
            .success(&[status])
            .failure(&[INSTANCE_STATUS_LAUNCH_FAILED])
            .not_found(NotFound::Retry)
            .until_status(|| async move {
                let instance = self.cvm().describe_instance(instance_id).await?;
                Ok::<_, CheckError>(observe(instance, |i| i.instance_state))
            })
            .await?;
        Ok(())
    }
}
