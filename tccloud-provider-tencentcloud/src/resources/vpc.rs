use std::collections::HashMap;

use tccloud_core::provider::{ProviderError, ProviderResult};
use tccloud_core::resource::{AttributesExt, Resource, ResourceId, State, Value};
use tccloud_core::waiter::DEFAULT_POLL_INTERVAL;

use super::{
    changed, deleted, insert_non_empty, required_str, settled, tags_value, tolerate_not_found,
    wait_visible,
};
use crate::TencentCloudProvider;
use crate::helper::{route_id_decode, route_id_encode};
use crate::services::vpc::{
    LegacyRoute, SecurityGroupSpec, SubnetSpec, VpcSpec, route_next_type_code,
};
use crate::services::{read_retry, tags_from_map, write_retry};

impl TencentCloudProvider {
    // ========== VPC Operations ==========

    pub(crate) async fn read_vpc(&self, id: ResourceId, vpc_id: &str) -> ProviderResult<State> {
        let vpc = tolerate_not_found(
            read_retry(|| async move { self.vpc().describe_vpc(vpc_id).await }).await,
        )?;
        let Some(vpc) = vpc else {
            log::warn!("vpc {} not found, clearing state", vpc_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("name".to_string(), Value::String(vpc.vpc_name));
        attributes.insert("cidr_block".to_string(), Value::String(vpc.cidr_block));
        attributes.insert("dns_servers".to_string(), Value::from(vpc.dns_server_set));
        attributes.insert("is_multicast".to_string(), Value::Bool(vpc.enable_multicast));
        attributes.insert("tags".to_string(), tags_value(&vpc.tag_set));
        attributes.insert("is_default".to_string(), Value::Bool(vpc.is_default));
        attributes.insert("create_time".to_string(), Value::String(vpc.created_time));

        Ok(State::existing(id, attributes).with_identifier(vpc_id))
    }

    pub(crate) async fn create_vpc(&self, resource: Resource) -> ProviderResult<State> {
        let attrs = &resource.attributes;
        let spec = VpcSpec {
            vpc_id: None,
            vpc_name: required_str(&resource, "name")?.to_string(),
            cidr_block: Some(required_str(&resource, "cidr_block")?.to_string()),
            enable_multicast: attrs.bool("is_multicast").unwrap_or(true).to_string(),
            dns_servers: attrs.string_list("dns_servers").unwrap_or_default(),
            tags: attrs
                .string_map("tags")
                .map(|t| tags_from_map(&t))
                .unwrap_or_default(),
        };

        let spec = &spec;
        let vpc = write_retry(|| async move { self.vpc().create_vpc(spec).await }).await?;
        if vpc.vpc_id.is_empty() {
            return Err(
                ProviderError::new("CreateVpc returned no VpcId").for_resource(resource.id.clone()),
            );
        }
        let vpc_id = vpc.vpc_id.as_str();
        log::info!("vpc {} created", vpc_id);

        wait_visible(format!("vpc {} to be visible", vpc_id), || async move {
            self.vpc().describe_vpc(vpc_id).await
        })
        .await?;

        let state = self.read_vpc(resource.id.clone(), vpc_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_vpc(
        &self,
        id: ResourceId,
        vpc_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let attrs = &to.attributes;
        let dns_changed = changed(from, &to, "dns_servers");
        if changed(from, &to, "name") || dns_changed || changed(from, &to, "is_multicast") {
            let spec = VpcSpec {
                vpc_id: Some(vpc_id.to_string()),
                vpc_name: required_str(&to, "name")?.to_string(),
                cidr_block: None,
                enable_multicast: attrs.bool("is_multicast").unwrap_or(true).to_string(),
                dns_servers: if dns_changed {
                    attrs.string_list("dns_servers").unwrap_or_default()
                } else {
                    Vec::new()
                },
                tags: Vec::new(),
            };
            let spec = &spec;
            write_retry(|| async move { self.vpc().modify_vpc_attribute(spec).await }).await?;
        }

        let state = self.read_vpc(id, vpc_id).await?;
        settled(state, &to)
    }

    pub(crate) async fn delete_vpc(&self, vpc_id: &str) -> ProviderResult<()> {
        deleted(write_retry(|| async move { self.vpc().delete_vpc(vpc_id).await }).await)
    }

    // ========== Subnet Operations ==========

    pub(crate) async fn read_subnet(&self, id: ResourceId, subnet_id: &str) -> ProviderResult<State> {
        let subnet = tolerate_not_found(
            read_retry(|| async move { self.vpc().describe_subnet(subnet_id).await }).await,
        )?;
        let Some(subnet) = subnet else {
            log::warn!("subnet {} not found, clearing state", subnet_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("vpc_id".to_string(), Value::String(subnet.vpc_id));
        attributes.insert("name".to_string(), Value::String(subnet.subnet_name));
        attributes.insert("cidr_block".to_string(), Value::String(subnet.cidr_block));
        attributes.insert("availability_zone".to_string(), Value::String(subnet.zone));
        attributes.insert("is_multicast".to_string(), Value::Bool(subnet.enable_broadcast));
        insert_non_empty(&mut attributes, "route_table_id", &subnet.route_table_id);
        attributes.insert("is_default".to_string(), Value::Bool(subnet.is_default));
        attributes.insert(
            "available_ip_count".to_string(),
            Value::Int(subnet.available_ip_address_count),
        );
        attributes.insert("create_time".to_string(), Value::String(subnet.created_time));

        Ok(State::existing(id, attributes).with_identifier(subnet_id))
    }

    pub(crate) async fn create_subnet(&self, resource: Resource) -> ProviderResult<State> {
        let attrs = &resource.attributes;
        let name = required_str(&resource, "name")?;
        let spec = SubnetSpec {
            vpc_id: required_str(&resource, "vpc_id")?.to_string(),
            subnet_name: name.to_string(),
            cidr_block: required_str(&resource, "cidr_block")?.to_string(),
            zone: required_str(&resource, "availability_zone")?.to_string(),
            tags: Vec::new(),
        };

        let spec = &spec;
        let subnet = write_retry(|| async move { self.vpc().create_subnet(spec).await }).await?;
        if subnet.subnet_id.is_empty() {
            return Err(
                ProviderError::new("CreateSubnet returned no SubnetId").for_resource(resource.id.clone()),
            );
        }
        let subnet_id = subnet.subnet_id.as_str();
        log::info!("subnet {} created", subnet_id);

        wait_visible(format!("subnet {} to be visible", subnet_id), || async move {
            self.vpc().describe_subnet(subnet_id).await
        })
        .await?;

        let multicast = attrs.bool("is_multicast").unwrap_or(true);
        if multicast != subnet.enable_broadcast {
            write_retry(|| async move {
                self.vpc()
                    .modify_subnet_attribute(subnet_id, name, multicast)
                    .await
            })
            .await?;
        }

        if let Some(route_table_id) = attrs.string("route_table_id") {
            write_retry(|| async move {
                self.vpc()
                    .replace_route_table_association(subnet_id, route_table_id)
                    .await
            })
            .await?;
        }

        let state = self.read_subnet(resource.id.clone(), subnet_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_subnet(
        &self,
        id: ResourceId,
        subnet_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        if changed(from, &to, "name") || changed(from, &to, "is_multicast") {
            let name = required_str(&to, "name")?;
            let multicast = to.attributes.bool("is_multicast").unwrap_or(true);
            write_retry(|| async move {
                self.vpc()
                    .modify_subnet_attribute(subnet_id, name, multicast)
                    .await
            })
            .await?;
        }

        if changed(from, &to, "route_table_id")
            && let Some(route_table_id) = to.attributes.string("route_table_id")
        {
            write_retry(|| async move {
                self.vpc()
                    .replace_route_table_association(subnet_id, route_table_id)
                    .await
            })
            .await?;
        }

        let state = self.read_subnet(id, subnet_id).await?;
        settled(state, &to)
    }

    pub(crate) async fn delete_subnet(&self, subnet_id: &str) -> ProviderResult<()> {
        deleted(write_retry(|| async move { self.vpc().delete_subnet(subnet_id).await }).await)
    }

    // ========== Route Table Operations ==========

    pub(crate) async fn read_route_table(&self, id: ResourceId, route_table_id: &str) -> ProviderResult<State> {
        let table = tolerate_not_found(
            read_retry(|| async move { self.vpc().describe_route_table(route_table_id).await }).await,
        )?;
        let Some(table) = table else {
            log::warn!("route table {} not found, clearing state", route_table_id);
            return Ok(State::not_found(id));
        };

        let subnet_ids: Vec<String> = table
            .association_set
            .iter()
            .map(|a| a.subnet_id.clone())
            .collect();
        let route_entry_ids: Vec<String> = table
            .route_set
            .iter()
            .map(|r| r.route_id.to_string())
            .collect();

        let mut attributes = HashMap::new();
        attributes.insert("vpc_id".to_string(), Value::String(table.vpc_id));
        attributes.insert("name".to_string(), Value::String(table.route_table_name));
        attributes.insert("subnet_ids".to_string(), Value::from(subnet_ids));
        attributes.insert("route_entry_ids".to_string(), Value::from(route_entry_ids));
        attributes.insert("is_default".to_string(), Value::Bool(table.main));
        attributes.insert("create_time".to_string(), Value::String(table.created_time));

        Ok(State::existing(id, attributes).with_identifier(route_table_id))
    }

    pub(crate) async fn create_route_table(&self, resource: Resource) -> ProviderResult<State> {
        let vpc_id = required_str(&resource, "vpc_id")?;
        let name = required_str(&resource, "name")?;

        let route_table_id =
            write_retry(|| async move { self.vpc().create_route_table(vpc_id, name).await }).await?;
        if route_table_id.is_empty() {
            return Err(ProviderError::new("CreateRouteTable returned no RouteTableId")
                .for_resource(resource.id.clone()));
        }
        let route_table_id = route_table_id.as_str();

        wait_visible(format!("route table {} to be visible", route_table_id), || async move {
            self.vpc().describe_route_table(route_table_id).await
        })
        .await?;

        let state = self.read_route_table(resource.id.clone(), route_table_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_route_table(
        &self,
        id: ResourceId,
        route_table_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        if changed(from, &to, "name") {
            let name = required_str(&to, "name")?;
            write_retry(|| async move {
                self.vpc()
                    .modify_route_table_attribute(route_table_id, name)
                    .await
            })
            .await?;
        }
        self.read_route_table(id, route_table_id).await
    }

    pub(crate) async fn delete_route_table(&self, route_table_id: &str) -> ProviderResult<()> {
        deleted(
            write_retry(|| async move { self.vpc().delete_route_table(route_table_id).await }).await,
        )
    }

    // ========== Route Entry Operations ==========

    pub(crate) async fn read_route_entry(&self, id: ResourceId, identifier: &str) -> ProviderResult<State> {
        let entry = route_id_decode(identifier)?;
        let next_type = route_next_type_code(&entry.next_type).ok_or_else(|| {
            ProviderError::new(format!("unknown next_type '{}' in id", entry.next_type))
        })?;
        let wanted = LegacyRoute {
            destination_cidr_block: entry.cidr_block.clone(),
            next_type,
            next_hub: entry.next_hub.clone(),
        };

        let (vpc_id, route_table_id) = (entry.vpc_id.as_str(), entry.route_table_id.as_str());
        let mut found = false;
        for attempt in 0..2 {
            if attempt > 0 {
                tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
            }
            let routes = read_retry(|| async move {
                self.vpc().describe_legacy_routes(vpc_id, route_table_id).await
            })
            .await?;
            let Some(routes) = routes else {
                log::warn!("route table {} not found, clearing route entry state", route_table_id);
                return Ok(State::not_found(id));
            };
            if routes.contains(&wanted) {
                found = true;
                break;
            }
        }
        if !found {
            log::warn!("route entry {} not found, clearing state", identifier);
            return Ok(State::not_found(id));
        }

        let mut attributes = HashMap::new();
        attributes.insert("vpc_id".to_string(), Value::String(entry.vpc_id));
        attributes.insert("route_table_id".to_string(), Value::String(entry.route_table_id));
        attributes.insert("cidr_block".to_string(), Value::String(entry.cidr_block));
        attributes.insert("next_type".to_string(), Value::String(entry.next_type));
        attributes.insert("next_hub".to_string(), Value::String(entry.next_hub));

        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    pub(crate) async fn create_route_entry(&self, resource: Resource) -> ProviderResult<State> {
        let vpc_id = required_str(&resource, "vpc_id")?;
        let route_table_id = required_str(&resource, "route_table_id")?;
        let cidr_block = required_str(&resource, "cidr_block")?;
        let next_type_name = required_str(&resource, "next_type")?;
        let next_hub = required_str(&resource, "next_hub")?;

        let next_type = route_next_type_code(next_type_name).ok_or_else(|| {
            ProviderError::new(format!("unknown next_type '{}'", next_type_name))
                .for_resource(resource.id.clone())
        })?;
        let route = LegacyRoute {
            destination_cidr_block: cidr_block.to_string(),
            next_type,
            next_hub: next_hub.to_string(),
        };

        let route = &route;
        write_retry(|| async move {
            self.vpc()
                .create_route(vpc_id, route_table_id, route)
                .await
        })
        .await?;

        let identifier = route_id_encode(vpc_id, route_table_id, cidr_block, next_type_name, next_hub);
        let state = self.read_route_entry(resource.id.clone(), &identifier).await?;
        settled(state, &resource)
    }

    pub(crate) async fn delete_route_entry(&self, identifier: &str) -> ProviderResult<()> {
        let entry = route_id_decode(identifier)?;
        let next_type = route_next_type_code(&entry.next_type).ok_or_else(|| {
            ProviderError::new(format!("unknown next_type '{}' in id", entry.next_type))
        })?;
        let route = LegacyRoute {
            destination_cidr_block: entry.cidr_block.clone(),
            next_type,
            next_hub: entry.next_hub.clone(),
        };

        let (vpc_id, route_table_id, route) = (entry.vpc_id.as_str(), entry.route_table_id.as_str(), &route);
        deleted(
            write_retry(|| async move {
                self.vpc()
                    .delete_route(vpc_id, route_table_id, route)
                    .await
            })
            .await,
        )
    }

    // ========== Security Group Operations ==========

    pub(crate) async fn read_security_group(&self, id: ResourceId, group_id: &str) -> ProviderResult<State> {
        let group = tolerate_not_found(
            read_retry(|| async move { self.vpc().describe_security_group(group_id).await }).await,
        )?;
        let Some(group) = group else {
            log::warn!("security group {} not found, clearing state", group_id);
            return Ok(State::not_found(id));
        };

        let mut attributes = HashMap::new();
        attributes.insert("name".to_string(), Value::String(group.security_group_name));
        insert_non_empty(&mut attributes, "description", &group.security_group_desc);
        attributes.insert(
            "project_id".to_string(),
            Value::Int(group.project_id.parse().unwrap_or(0)),
        );
        attributes.insert("tags".to_string(), tags_value(&group.tag_set));
        attributes.insert("create_time".to_string(), Value::String(group.created_time));

        Ok(State::existing(id, attributes).with_identifier(group_id))
    }

    pub(crate) async fn create_security_group(&self, resource: Resource) -> ProviderResult<State> {
        let attrs = &resource.attributes;
        let spec = SecurityGroupSpec {
            group_name: required_str(&resource, "name")?.to_string(),
            group_description: attrs.string("description").unwrap_or_default().to_string(),
            project_id: attrs.int("project_id").map(|p| p.to_string()),
            tags: attrs
                .string_map("tags")
                .map(|t| tags_from_map(&t))
                .unwrap_or_default(),
        };

        let spec = &spec;
        let group_id =
            write_retry(|| async move { self.vpc().create_security_group(spec).await }).await?;
        let group_id = group_id.as_str();
        log::info!("security group {} created", group_id);

        wait_visible(format!("security group {} to be visible", group_id), || async move {
            self.vpc().describe_security_group(group_id).await
        })
        .await?;

        let state = self.read_security_group(resource.id.clone(), group_id).await?;
        settled(state, &resource)
    }

    pub(crate) async fn update_security_group(
        &self,
        id: ResourceId,
        group_id: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let rename = changed(from, &to, "name");
        let redescribe = changed(from, &to, "description");
        if rename || redescribe {
            let name = to.attributes.string("name").filter(|_| rename);
            let description = to.attributes.string("description").filter(|_| redescribe);
            write_retry(|| async move {
                self.vpc()
                    .modify_security_group_attribute(group_id, name, description)
                    .await
            })
            .await?;
        }
        self.read_security_group(id, group_id).await
    }

    /// `ResourceInUse` is retried until instances release the group
    pub(crate) async fn delete_security_group(&self, group_id: &str) -> ProviderResult<()> {
        deleted(
            write_retry(|| async move { self.vpc().delete_security_group(group_id).await }).await,
        )
    }
}
