use std::collections::HashMap;

use tccloud_core::provider::{ProviderError, ProviderResult};
use tccloud_core::resource::{AttributesExt, Resource, ResourceId, State, Value};

use super::{
    changed, deleted, insert_non_empty, required_str, settled, tolerate_not_found, wait_visible,
};
use crate::TencentCloudProvider;
use crate::services::tsf::{
    ApiGroupRequest, CreateApplicationRequest, CreateConfigRequest, CreateGroupRequest,
    CreateNamespaceRequest, ModifyNamespaceRequest,
};
use crate::services::{read_retry, write_retry};

/// Separator of the binding and release ids
const PAIR_SEPARATOR: char = '#';

fn pair_id(first: &str, second: &str) -> String {
    format!("{}{}{}", first, PAIR_SEPARATOR, second)
}

fn split_pair_id<'a>(id: &'a str, kind: &str) -> ProviderResult<(&'a str, &'a str)> {
    match id.split_once(PAIR_SEPARATOR) {
        Some((first, second))
            if !first.is_empty() && !second.is_empty() && !second.contains(PAIR_SEPARATOR) =>
        {
            Ok((first, second))
        }
        _ => Err(ProviderError::new(format!("{} id is broken: {}", kind, id))),
    }
}

fn optional(resource: &Resource, key: &str) -> Option<String> {
    resource.attributes.string(key).map(String::from)
}

impl TencentCloudProvider {
    // ========== Namespace Operations ==========

    pub(crate) async fn read_tsf_namespace(&self, id: ResourceId, namespace_id: &str) -> ProviderResult<State> {
        let namespace = tolerate_not_found(
            read_retry(|| async move { self.tsf().describe_namespace(namespace_id).await }).await,
        )?;
        let Some(ns) = namespace else {
            log::warn!("tsf namespace {} not found, clearing state", namespace_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("namespace_name".to_string(), Value::String(ns.namespace_name));
        insert_non_empty(&mut attributes, "cluster_id", &ns.cluster_id);
        insert_non_empty(&mut attributes, "namespace_desc", &ns.namespace_desc);
        insert_non_empty(&mut attributes, "namespace_resource_type", &ns.namespace_resource_type);
        insert_non_empty(&mut attributes, "namespace_type", &ns.namespace_type);
        insert_non_empty(&mut attributes, "is_ha_enable", &ns.is_ha_enable);
        attributes.insert("namespace_code".to_string(), Value::String(ns.namespace_code));
        attributes.insert("namespace_status".to_string(), Value::String(ns.namespace_status));
        attributes.insert("is_default".to_string(), Value::String(ns.is_default));
        attributes.insert("create_time".to_string(), Value::String(ns.creation_time));

        Ok(State::existing(id, attributes).with_identifier(namespace_id))
    }

    pub(crate) async fn create_tsf_namespace(&self, resource: Resource) -> ProviderResult<State> {
        let req = CreateNamespaceRequest {
            namespace_name: required_str(&resource, "namespace_name")?.to_string(),
            cluster_id: optional(&resource, "cluster_id"),
            namespace_desc: optional(&resource, "namespace_desc"),
            namespace_resource_type: optional(&resource, "namespace_resource_type"),
            namespace_type: optional(&resource, "namespace_type"),
            is_ha_enable: optional(&resource, "is_ha_enable"),
            program_id: optional(&resource, "program_id"),
        };

        let req = &req;
        let namespace_id = write_retry(|| async move { self.tsf().create_namespace(req).await }).await?;
        let namespace_id = namespace_id.as_str();
        log::info!("tsf namespace {} created", namespace_id);

        wait_visible(format!("tsf namespace {} to be visible", namespace_id), || async move {
            self.tsf().describe_namespace(namespace_id).await
        })
        .await?;

        let state = self.read_tsf_namespace(resource.id.clone(), namespace_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_tsf_namespace(
        &self,
        id: ResourceId,
        namespace_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let pick = |key: &str| optional(&to, key).filter(|_| changed(from, &to, key));
        let req = ModifyNamespaceRequest {
            namespace_id: namespace_id.to_string(),
            namespace_name: pick("namespace_name"),
            namespace_desc: pick("namespace_desc"),
            is_ha_enable: pick("is_ha_enable"),
        };
        if req.namespace_name.is_some() || req.namespace_desc.is_some() || req.is_ha_enable.is_some() {
            let req = &req;
            write_retry(|| async move { self.tsf().modify_namespace(req).await }).await?;
        }

        let state = self.read_tsf_namespace(id, namespace_id).await?;
        settled(state, &to)
    }

    pub(crate) async fn delete_tsf_namespace(&self, namespace_id: &str, from: &State) -> ProviderResult<()> {
        let cluster_id = from.attributes.string("cluster_id");
        deleted(
            write_retry(|| async move { self.tsf().delete_namespace(namespace_id, cluster_id).await })
                .await,
        )
    }

    // ========== Application Operations ==========

    pub(crate) async fn read_tsf_application(&self, id: ResourceId, application_id: &str) -> ProviderResult<State> {
        let application = tolerate_not_found(
            read_retry(|| async move { self.tsf().describe_application(application_id).await }).await,
        )?;
        let Some(app) = application else {
            log::warn!("tsf application {} not found, clearing state", application_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("application_name".to_string(), Value::String(app.application_name));
        attributes.insert("application_type".to_string(), Value::String(app.application_type));
        attributes.insert("microservice_type".to_string(), Value::String(app.microservice_type));
        insert_non_empty(&mut attributes, "application_desc", &app.application_desc);
        insert_non_empty(&mut attributes, "application_runtime_type", &app.application_runtime_type);
        attributes.insert("create_time".to_string(), Value::String(app.create_time));

        Ok(State::existing(id, attributes).with_identifier(application_id))
    }

    pub(crate) async fn create_tsf_application(&self, resource: Resource) -> ProviderResult<State> {
        let req = CreateApplicationRequest {
            application_name: required_str(&resource, "application_name")?.to_string(),
            application_type: required_str(&resource, "application_type")?.to_string(),
            microservice_type: required_str(&resource, "microservice_type")?.to_string(),
            application_desc: optional(&resource, "application_desc"),
            application_runtime_type: optional(&resource, "application_runtime_type"),
            program_id: optional(&resource, "program_id"),
        };

        let req = &req;
        let application_id =
            write_retry(|| async move { self.tsf().create_application(req).await }).await?;
        let application_id = application_id.as_str();
        log::info!("tsf application {} created", application_id);

        wait_visible(format!("tsf application {} to be visible", application_id), || async move {
            self.tsf().describe_application(application_id).await
        })
        .await?;

        let state = self.read_tsf_application(resource.id.clone(), application_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_tsf_application(
        &self,
        id: ResourceId,
        application_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let rename = changed(from, &to, "application_name");
        let redescribe = changed(from, &to, "application_desc");
        if rename || redescribe {
            let name = to.attributes.string("application_name").filter(|_| rename);
            let desc = to.attributes.string("application_desc").filter(|_| redescribe);
            write_retry(|| async move {
                self.tsf()
                    .modify_application(application_id, name, desc)
                    .await
            })
            .await?;
        }

        let state = self.read_tsf_application(id, application_id).await?;
        settled(state, &to)
    }

    pub(crate) async fn delete_tsf_application(&self, application_id: &str) -> ProviderResult<()> {
        deleted(
            write_retry(|| async move { self.tsf().delete_application(application_id).await }).await,
        )
    }

    // ========== Group Operations ==========

    pub(crate) async fn read_tsf_group(&self, id: ResourceId, group_id: &str) -> ProviderResult<State> {
        let group = tolerate_not_found(
            read_retry(|| async move { self.tsf().describe_group(group_id).await }).await,
        )?;
        let Some(group) = group else {
            log::warn!("tsf group {} not found, clearing state", group_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("application_id".to_string(), Value::String(group.application_id));
        attributes.insert("namespace_id".to_string(), Value::String(group.namespace_id));
        attributes.insert("group_name".to_string(), Value::String(group.group_name));
        attributes.insert("cluster_id".to_string(), Value::String(group.cluster_id));
        insert_non_empty(&mut attributes, "group_desc", &group.group_desc);
        insert_non_empty(&mut attributes, "group_resource_type", &group.group_resource_type);
        insert_non_empty(&mut attributes, "alias", &group.alias);
        attributes.insert("group_status".to_string(), Value::String(group.group_status));
        attributes.insert("create_time".to_string(), Value::String(group.create_time));

        Ok(State::existing(id, attributes).with_identifier(group_id))
    }

    pub(crate) async fn create_tsf_group(&self, resource: Resource) -> ProviderResult<State> {
        let req = CreateGroupRequest {
            application_id: required_str(&resource, "application_id")?.to_string(),
            namespace_id: required_str(&resource, "namespace_id")?.to_string(),
            group_name: required_str(&resource, "group_name")?.to_string(),
            cluster_id: required_str(&resource, "cluster_id")?.to_string(),
            group_desc: optional(&resource, "group_desc"),
            group_resource_type: optional(&resource, "group_resource_type"),
            alias: optional(&resource, "alias"),
        };

        let req = &req;
        let group_id = write_retry(|| async move { self.tsf().create_group(req).await }).await?;
        let group_id = group_id.as_str();
        log::info!("tsf group {} created", group_id);

        wait_visible(format!("tsf group {} to be visible", group_id), || async move {
            self.tsf().describe_group(group_id).await
        })
        .await?;

        let state = self.read_tsf_group(resource.id.clone(), group_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_tsf_group(
        &self,
        id: ResourceId,
        group_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let redescribe = changed(from, &to, "group_desc");
        let realias = changed(from, &to, "alias");
        if redescribe || realias {
            let desc = to.attributes.string("group_desc").filter(|_| redescribe);
            let alias = to.attributes.string("alias").filter(|_| realias);
            write_retry(|| async move { self.tsf().modify_group(group_id, desc, alias).await })
                .await?;
        }
        self.read_tsf_group(id, group_id).await
    }

    pub(crate) async fn delete_tsf_group(&self, group_id: &str) -> ProviderResult<()> {
        deleted(write_retry(|| async move { self.tsf().delete_group(group_id).await }).await)
    }

    // ========== API Group Operations ==========

    pub(crate) async fn read_tsf_api_group(&self, id: ResourceId, group_id: &str) -> ProviderResult<State> {
        let group = tolerate_not_found(
            read_retry(|| async move { self.tsf().describe_api_group(group_id).await }).await,
        )?;
        let Some(group) = group else {
            log::warn!("tsf api group {} not found, clearing state", group_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("group_name".to_string(), Value::String(group.group_name));
        attributes.insert("group_context".to_string(), Value::String(group.group_context));
        insert_non_empty(&mut attributes, "auth_type", &group.auth_type);
        insert_non_empty(&mut attributes, "description", &group.description);
        insert_non_empty(&mut attributes, "group_type", &group.group_type);
        insert_non_empty(&mut attributes, "gateway_instance_id", &group.gateway_instance_id);
        insert_non_empty(&mut attributes, "namespace_name_key", &group.namespace_name_key);
        insert_non_empty(&mut attributes, "service_name_key", &group.service_name_key);
        insert_non_empty(
            &mut attributes,
            "namespace_name_key_position",
            &group.namespace_name_key_position,
        );
        insert_non_empty(
            &mut attributes,
            "service_name_key_position",
            &group.service_name_key_position,
        );
        attributes.insert("status".to_string(), Value::String(group.status));
        attributes.insert("created_time".to_string(), Value::String(group.created_time));
        attributes.insert("api_count".to_string(), Value::Int(group.api_count));

        Ok(State::existing(id, attributes).with_identifier(group_id))
    }

    fn api_group_request(resource: &Resource, group_id: Option<&str>) -> ProviderResult<ApiGroupRequest> {
        let creating = group_id.is_none();
        Ok(ApiGroupRequest {
            group_id: group_id.map(String::from),
            group_name: required_str(resource, "group_name")?.to_string(),
            group_context: required_str(resource, "group_context")?.to_string(),
            auth_type: optional(resource, "auth_type"),
            description: optional(resource, "description"),
            group_type: optional(resource, "group_type").filter(|_| creating),
            gateway_instance_id: optional(resource, "gateway_instance_id").filter(|_| creating),
            namespace_name_key: optional(resource, "namespace_name_key"),
            service_name_key: optional(resource, "service_name_key"),
            namespace_name_key_position: optional(resource, "namespace_name_key_position"),
            service_name_key_position: optional(resource, "service_name_key_position"),
        })
    }

    pub(crate) async fn create_tsf_api_group(&self, resource: Resource) -> ProviderResult<State> {
        let req = Self::api_group_request(&resource, None)?;

        let req = &req;
        let group_id = write_retry(|| async move { self.tsf().create_api_group(req).await }).await?;
        let group_id = group_id.as_str();
        log::info!("tsf api group {} created", group_id);

        wait_visible(format!("tsf api group {} to be visible", group_id), || async move {
            self.tsf().describe_api_group(group_id).await
        })
        .await?;

        let state = self.read_tsf_api_group(resource.id.clone(), group_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_tsf_api_group(
        &self,
        id: ResourceId,
        group_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let updatable = [
            "group_name",
            "group_context",
            "auth_type",
            "description",
            "namespace_name_key",
            "service_name_key",
            "namespace_name_key_position",
            "service_name_key_position",
        ];
        if updatable.iter().any(|key| changed(from, &to, key)) {
            let req = Self::api_group_request(&to, Some(group_id))?;
            let req = &req;
            write_retry(|| async move { self.tsf().update_api_group(req).await }).await?;
        }
        self.read_tsf_api_group(id, group_id).await
    }

    pub(crate) async fn delete_tsf_api_group(&self, group_id: &str) -> ProviderResult<()> {
        deleted(write_retry(|| async move { self.tsf().delete_api_group(group_id).await }).await)
    }

    // ========== API Group Binding Operations ==========

    pub(crate) async fn read_tsf_bind_api_group(&self, id: ResourceId, identifier: &str) -> ProviderResult<State> {
        let (group_id, gateway_id) = split_pair_id(identifier, "api group binding")?;
        let gateways = match read_retry(|| async move {
            self.tsf().describe_group_binded_gateways(group_id).await
        })
        .await
        {
            Ok(gateways) => gateways,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        if !gateways.iter().any(|g| g.deploy_group_id == gateway_id) {
            log::warn!("tsf api group binding {} not found, clearing state", identifier);
            return Ok(State::not_found(id));
        }

        let mut attributes = HashMap::new();
        attributes.insert("group_id".to_string(), Value::String(group_id.to_string()));
        attributes.insert(
            "gateway_deploy_group_id".to_string(),
            Value::String(gateway_id.to_string()),
        );

        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    pub(crate) async fn create_tsf_bind_api_group(&self, resource: Resource) -> ProviderResult<State> {
        let group_id = required_str(&resource, "group_id")?;
        let gateway_id = required_str(&resource, "gateway_deploy_group_id")?;

        write_retry(|| async move { self.tsf().bind_api_group(group_id, gateway_id).await }).await?;

        let identifier = pair_id(group_id, gateway_id);
        let state = self.read_tsf_bind_api_group(resource.id.clone(), &identifier).await?;
        settled(state, &resource)
    }

    pub(crate) async fn delete_tsf_bind_api_group(&self, identifier: &str) -> ProviderResult<()> {
        let (group_id, gateway_id) = split_pair_id(identifier, "api group binding")?;
        deleted(
            write_retry(|| async move { self.tsf().unbind_api_group(group_id, gateway_id).await })
                .await,
        )
    }

    // ========== Application Config Operations ==========

    pub(crate) async fn read_tsf_application_config(&self, id: ResourceId, config_id: &str) -> ProviderResult<State> {
        let config = tolerate_not_found(
            read_retry(|| async move { self.tsf().describe_config(config_id).await }).await,
        )?;
        let Some(config) = config else {
            log::warn!("tsf application config {} not found, clearing state", config_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("config_name".to_string(), Value::String(config.config_name));
        attributes.insert("config_version".to_string(), Value::String(config.config_version));
        attributes.insert("config_value".to_string(), Value::String(config.config_value));
        attributes.insert("application_id".to_string(), Value::String(config.application_id));
        insert_non_empty(&mut attributes, "config_version_desc", &config.config_version_desc);
        insert_non_empty(&mut attributes, "config_type", &config.config_type);
        attributes.insert("creation_time".to_string(), Value::String(config.creation_time));

        Ok(State::existing(id, attributes).with_identifier(config_id))
    }

    pub(crate) async fn create_tsf_application_config(&self, resource: Resource) -> ProviderResult<State> {
        let req = CreateConfigRequest {
            config_name: required_str(&resource, "config_name")?.to_string(),
            config_version: required_str(&resource, "config_version")?.to_string(),
            config_value: required_str(&resource, "config_value")?.to_string(),
            application_id: required_str(&resource, "application_id")?.to_string(),
            config_version_desc: optional(&resource, "config_version_desc"),
            config_type: optional(&resource, "config_type"),
            encode_with_base64: resource.attributes.bool("encode_with_base64"),
        };

        let req = &req;
        let config_id = write_retry(|| async move { self.tsf().create_config(req).await }).await?;
        let config_id = config_id.as_str();
        log::info!("tsf application config {} created", config_id);

        wait_visible(format!("tsf config {} to be visible", config_id), || async move {
            self.tsf().describe_config(config_id).await
        })
        .await?;

        let state = self.read_tsf_application_config(resource.id.clone(), config_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn delete_tsf_application_config(&self, config_id: &str) -> ProviderResult<()> {
        deleted(write_retry(|| async move { self.tsf().delete_config(config_id).await }).await)
    }

    // ========== Config Release Operations ==========

    pub(crate) async fn read_tsf_application_release_config(
        &self,
        id: ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let (config_id, group_id) = split_pair_id(identifier, "config release")?;
        let release = tolerate_not_found(
            read_retry(|| async move {
                self.tsf()
                    .describe_config_release(config_id, group_id)
                    .await
            })
            .await,
        )?;
        let Some(release) = release else {
            log::warn!("tsf config release {} not found, clearing state", identifier);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("config_id".to_string(), Value::String(config_id.to_string()));
        attributes.insert("group_id".to_string(), Value::String(group_id.to_string()));
        insert_non_empty(&mut attributes, "release_desc", &release.release_desc);
        attributes.insert(
            "config_release_id".to_string(),
            Value::String(release.config_release_id),
        );
        attributes.insert("release_time".to_string(), Value::String(release.release_time));

        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    pub(crate) async fn create_tsf_application_release_config(&self, resource: Resource) -> ProviderResult<State> {
        let config_id = required_str(&resource, "config_id")?;
        let group_id = required_str(&resource, "group_id")?;
        let release_desc = resource.attributes.string("release_desc");

        write_retry(|| async move {
            self.tsf()
                .release_config(config_id, group_id, release_desc)
                .await
        })
        .await?;

        wait_visible(
            format!("tsf config {} release to group {}", config_id, group_id),
            || async move { self.tsf().describe_config_release(config_id, group_id).await },
        )
        .await?;

        let identifier = pair_id(config_id, group_id);
        let state = self
            .read_tsf_application_release_config(resource.id.clone(), &identifier)
            .await?;
        settled(state, &resource)
    }

    pub(crate) async fn delete_tsf_application_release_config(&self, identifier: &str) -> ProviderResult<()> {
        let (config_id, group_id) = split_pair_id(identifier, "config release")?;
        let release = tolerate_not_found(
            read_retry(|| async move {
                self.tsf()
                    .describe_config_release(config_id, group_id)
                    .await
            })
            .await,
        )?;
        let Some(release) = release else {
            return Ok(());
        };

        let release_id = release.config_release_id.as_str();
        deleted(write_retry(|| async move { self.tsf().revoke_config(release_id).await }).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_id() {
        let id = pair_id("grp-1", "group-gw");
        assert_eq!(id, "grp-1#group-gw");
        assert_eq!(split_pair_id(&id, "binding").unwrap(), ("grp-1", "group-gw"));
    }

    #[test]
    fn test_broken_pair_ids() {
        assert!(split_pair_id("grp-1", "binding").is_err());
        assert!(split_pair_id("#group-gw", "binding").is_err());
        assert!(split_pair_id("a#b#c", "binding").is_err());
        let err = split_pair_id("dcfg-1", "config release").unwrap_err();
        assert!(err.message.contains("config release id is broken"));
    }

    #[test]
    fn test_api_group_request_skips_create_only_fields_on_update() {
        let resource = Resource::new("tsf_api_group", "api")
            .with_attribute("group_name", "api")
            .with_attribute("group_context", "/api")
            .with_attribute("group_type", "ms")
            .with_attribute("gateway_instance_id", "gw-ins-1");

        let create = TencentCloudProvider::api_group_request(&resource, None).unwrap();
        assert_eq!(create.group_type.as_deref(), Some("ms"));
        assert_eq!(create.gateway_instance_id.as_deref(), Some("gw-ins-1"));

        let update = TencentCloudProvider::api_group_request(&resource, Some("grp-1")).unwrap();
        assert_eq!(update.group_id.as_deref(), Some("grp-1"));
        assert!(update.group_type.is_none());
        assert!(update.gateway_instance_id.is_none());
    }
}
