//! tccloud Tencent Cloud provider
//!
//! Maps resource and data source declarations onto the CVM, CBS, VPC,
//! TcaplusDB and TSF control-plane APIs.

pub mod config;
pub mod connectivity;
mod data_sources;
pub mod error;
pub mod helper;
pub mod output;
mod resources;
pub mod schemas;
pub mod services;

use std::collections::HashMap;

use tccloud_core::provider::{
    BoxFuture, Provider, ProviderError, ProviderResult, ResourceType,
};
use tccloud_core::resource::{Resource, ResourceId, State, Value};
use tccloud_core::schema::ResourceSchema;

use config::ProviderConfig;
use connectivity::TencentCloudClient;
use services::cbs::CbsService;
use services::cvm::CvmService;
use services::tcaplus::TcaplusService;
use services::tsf::TsfService;
use services::vpc::VpcService;

/// Resource type or data source served by this provider
pub struct TencentCloudType {
    name: &'static str,
    schema: schemas::SchemaFn,
}

impl ResourceType for TencentCloudType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schema(&self) -> ResourceSchema {
        (self.schema)()
    }
}

fn types_of(table: &[(&'static str, schemas::SchemaFn)]) -> Vec<Box<dyn ResourceType>> {
    table
        .iter()
        .map(|(name, schema)| {
            Box::new(TencentCloudType {
                name,
                schema: *schema,
            }) as Box<dyn ResourceType>
        })
        .collect()
}

/// Tencent Cloud Provider
pub struct TencentCloudProvider {
    client: TencentCloudClient,
}

impl TencentCloudProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = TencentCloudClient::new(config)?;
        Ok(Self { client })
    }

    /// Build from provider arguments, falling back to `TENCENTCLOUD_*` variables
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> ProviderResult<Self> {
        Self::new(ProviderConfig::from_attributes(attributes)?)
    }

    pub(crate) fn cvm(&self) -> CvmService<'_> {
        CvmService::new(&self.client)
    }

    pub(crate) fn cbs(&self) -> CbsService<'_> {
        CbsService::new(&self.client)
    }

    pub(crate) fn vpc(&self) -> VpcService<'_> {
        VpcService::new(&self.client)
    }

    pub(crate) fn tcaplus(&self) -> TcaplusService<'_> {
        TcaplusService::new(&self.client)
    }

    pub(crate) fn tsf(&self) -> TsfService<'_> {
        TsfService::new(&self.client)
    }
}

/// Validate the declared attributes and fill in schema defaults
fn prepare(resource: &Resource) -> ProviderResult<Resource> {
    let schema = if resource.is_data_source() {
        schemas::data_source_schema(&resource.id.resource_type)
    } else {
        schemas::resource_schema(&resource.id.resource_type)
    }
    .ok_or_else(|| unknown_type(&resource.id))?;

    schema
        .validate(&resource.attributes)
        .map_err(|errors| ProviderError::validation(&errors).for_resource(resource.id.clone()))?;

    let mut prepared = resource.clone();
    schema.apply_defaults(&mut prepared.attributes);
    Ok(prepared)
}

fn unknown_type(id: &ResourceId) -> ProviderError {
    ProviderError::new(format!("Unknown resource type: {}", id.resource_type)).for_resource(id.clone())
}

/// Keep declared values the describe calls cannot return
fn with_declared(mut state: State, to: &Resource) -> State {
    if state.exists {
        for (key, value) in &to.attributes {
            state
                .attributes
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
    state
}

/// Tag errors raised below the dispatch with the resource they concern
fn scoped<T>(result: ProviderResult<T>, id: &ResourceId) -> ProviderResult<T> {
    result.map_err(|e| {
        if e.resource_id.is_some() {
            e
        } else {
            e.for_resource(id.clone())
        }
    })
}

impl Provider for TencentCloudProvider {
    fn name(&self) -> &'static str {
        "tencentcloud"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        types_of(schemas::RESOURCES)
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        types_of(schemas::DATA_SOURCES)
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(String::from);
        Box::pin(async move {
            let Some(identifier) = identifier.filter(|i| !i.is_empty()) else {
                return Ok(State::not_found(id));
            };
            let result = match id.resource_type.as_str() {
                "instance" => self.read_instance(id.clone(), &identifier).await,
                "cbs_storage" => self.read_cbs_storage(id.clone(), &identifier).await,
                "cbs_storage_attachment" => self.read_cbs_storage_attachment(id.clone(), &identifier).await,
                "cbs_snapshot" => self.read_cbs_snapshot(id.clone(), &identifier).await,
                "vpc" => self.read_vpc(id.clone(), &identifier).await,
                "subnet" => self.read_subnet(id.clone(), &identifier).await,
                "route_table" => self.read_route_table(id.clone(), &identifier).await,
                "route_entry" => self.read_route_entry(id.clone(), &identifier).await,
                "security_group" => self.read_security_group(id.clone(), &identifier).await,
                "tcaplus_application" => self.read_tcaplus_application(id.clone(), &identifier).await,
                "tcaplus_zone" => self.read_tcaplus_zone(id.clone(), &identifier).await,
                "tcaplus_idl" => self.read_tcaplus_idl(id.clone(), &identifier).await,
                "tcaplus_table" => self.read_tcaplus_table(id.clone(), &identifier).await,
                "tsf_namespace" => self.read_tsf_namespace(id.clone(), &identifier).await,
                "tsf_application" => self.read_tsf_application(id.clone(), &identifier).await,
                "tsf_group" => self.read_tsf_group(id.clone(), &identifier).await,
                "tsf_api_group" => self.read_tsf_api_group(id.clone(), &identifier).await,
                "tsf_bind_api_group" => self.read_tsf_bind_api_group(id.clone(), &identifier).await,
                "tsf_application_config" => self.read_tsf_application_config(id.clone(), &identifier).await,
                "tsf_application_release_config" => {
                    self.read_tsf_application_release_config(id.clone(), &identifier).await
                }
                _ => Err(unknown_type(&id)),
            };
            scoped(result, &id)
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            let id = resource.id.clone();
            let resource = prepare(&resource)?;
            log::info!("creating {}.{}", id.resource_type, id.name);
            let result = match id.resource_type.as_str() {
                "instance" => self.create_instance(resource).await,
                "cbs_storage" => self.create_cbs_storage(resource).await,
                "cbs_storage_attachment" => self.create_cbs_storage_attachment(resource).await,
                "cbs_snapshot" => self.create_cbs_snapshot(resource).await,
                "vpc" => self.create_vpc(resource).await,
                "subnet" => self.create_subnet(resource).await,
                "route_table" => self.create_route_table(resource).await,
                "route_entry" => self.create_route_entry(resource).await,
                "security_group" => self.create_security_group(resource).await,
                "tcaplus_application" => self.create_tcaplus_application(resource).await,
                "tcaplus_zone" => self.create_tcaplus_zone(resource).await,
                "tcaplus_idl" => self.create_tcaplus_idl(resource).await,
                "tcaplus_table" => self.create_tcaplus_table(resource).await,
                "tsf_namespace" => self.create_tsf_namespace(resource).await,
                "tsf_application" => self.create_tsf_application(resource).await,
                "tsf_group" => self.create_tsf_group(resource).await,
                "tsf_api_group" => self.create_tsf_api_group(resource).await,
                "tsf_bind_api_group" => self.create_tsf_bind_api_group(resource).await,
                "tsf_application_config" => self.create_tsf_application_config(resource).await,
                "tsf_application_release_config" => {
                    self.create_tsf_application_release_config(resource).await
                }
                _ => Err(unknown_type(&id)),
            };
            scoped(result, &id)
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            let to = prepare(&to)?;
            let schema = schemas::resource_schema(&id.resource_type).ok_or_else(|| unknown_type(&id))?;
            let mut from = from;
            schema.carry_write_only(&mut from.attributes, &to.attributes);
            let replace = schema.replacement_attributes(&from.attributes, &to.attributes);
            if !replace.is_empty() {
                return Err(ProviderError::new(format!(
                    "Changing {} requires replacement",
                    replace.join(", ")
                ))
                .for_resource(id));
            }

            log::info!("updating {}.{} ({})", id.resource_type, id.name, identifier);
            let identifier = identifier.as_str();
            let result = match id.resource_type.as_str() {
                "instance" => self.update_instance(id.clone(), identifier, &from, to).await,
                "cbs_storage" => self.update_cbs_storage(id.clone(), identifier, &from, to).await,
                "cbs_snapshot" => self.update_cbs_snapshot(id.clone(), identifier, &from, to).await,
                "vpc" => self.update_vpc(id.clone(), identifier, &from, to).await,
                "subnet" => self.update_subnet(id.clone(), identifier, &from, to).await,
                "route_table" => self.update_route_table(id.clone(), identifier, &from, to).await,
                "security_group" => self.update_security_group(id.clone(), identifier, &from, to).await,
                "tcaplus_application" => {
                    self.update_tcaplus_application(id.clone(), identifier, &from, to).await
                }
                "tcaplus_zone" => self.update_tcaplus_zone(id.clone(), identifier, &from, to).await,
                "tcaplus_table" => self.update_tcaplus_table(id.clone(), identifier, &from, to).await,
                "tsf_namespace" => self.update_tsf_namespace(id.clone(), identifier, &from, to).await,
                "tsf_application" => self.update_tsf_application(id.clone(), identifier, &from, to).await,
                "tsf_group" => self.update_tsf_group(id.clone(), identifier, &from, to).await,
                "tsf_api_group" => self.update_tsf_api_group(id.clone(), identifier, &from, to).await,
                // No in-place updates: reread and keep the declaration
                "cbs_storage_attachment"
                | "route_entry"
                | "tcaplus_idl"
                | "tsf_bind_api_group"
                | "tsf_application_config"
                | "tsf_application_release_config" => self
                    .read(&id, Some(identifier))
                    .await
                    .map(|state| with_declared(state, &to)),
                _ => Err(unknown_type(&id)),
            };
            scoped(result, &id)
        })
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        Box::pin(async move {
            log::info!("deleting {}.{} ({})", id.resource_type, id.name, identifier);
            let identifier = identifier.as_str();
            let result = match id.resource_type.as_str() {
                "instance" => self.delete_instance(identifier).await,
                "cbs_storage" => self.delete_cbs_storage(identifier, &from).await,
                "cbs_storage_attachment" => self.delete_cbs_storage_attachment(identifier).await,
                "cbs_snapshot" => self.delete_cbs_snapshot(identifier).await,
                "vpc" => self.delete_vpc(identifier).await,
                "subnet" => self.delete_subnet(identifier).await,
                "route_table" => self.delete_route_table(identifier).await,
                "route_entry" => self.delete_route_entry(identifier).await,
                "security_group" => self.delete_security_group(identifier).await,
                "tcaplus_application" => self.delete_tcaplus_application(identifier).await,
                "tcaplus_zone" => self.delete_tcaplus_zone(identifier).await,
                "tcaplus_idl" => self.delete_tcaplus_idl(identifier).await,
                "tcaplus_table" => self.delete_tcaplus_table(identifier).await,
                "tsf_namespace" => self.delete_tsf_namespace(identifier, &from).await,
                "tsf_application" => self.delete_tsf_application(identifier).await,
                "tsf_group" => self.delete_tsf_group(identifier).await,
                "tsf_api_group" => self.delete_tsf_api_group(identifier).await,
                "tsf_bind_api_group" => self.delete_tsf_bind_api_group(identifier).await,
                "tsf_application_config" => self.delete_tsf_application_config(identifier).await,
                "tsf_application_release_config" => {
                    self.delete_tsf_application_release_config(identifier).await
                }
                _ => Err(unknown_type(&id)),
            };
            scoped(result, &id)
        })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone().with_read_only(true);
        Box::pin(async move {
            let id = resource.id.clone();
            let resource = prepare(&resource)?;
            let result = self.run_data_source(&resource).await;
            scoped(result, &id)
        })
    }
}
