//! Read-only describe queries
//!
//! Every data source resolves its inputs into vendor filters, collects the
//! matching objects as JSON rows and hands them to [`finish`], which derives
//! the stable result id, writes `result_output_file` and stores the list
//! attribute next to the echoed inputs.

mod cbs;
mod cvm;
mod tcaplus;
mod tsf;
mod vpc;

use tccloud_core::provider::{ProviderError, ProviderResult};
use tccloud_core::resource::{Resource, State, Value};

use crate::TencentCloudProvider;
use crate::helper::{Filter, build_filters_for_sdk, data_resource_ids_hash};
use crate::output;

/// Rows found by one data source query
pub(crate) struct QueryResult {
    pub ids: Vec<String>,
    pub list_attribute: &'static str,
    pub rows: Vec<serde_json::Value>,
}

impl QueryResult {
    pub fn new(list_attribute: &'static str) -> Self {
        Self {
            ids: Vec::new(),
            list_attribute,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, id: impl Into<String>, row: serde_json::Value) {
        self.ids.push(id.into());
        self.rows.push(row);
    }
}

impl TencentCloudProvider {
    pub(crate) async fn run_data_source(&self, resource: &Resource) -> ProviderResult<State> {
        let result = match resource.id.resource_type.as_str() {
            "instances" => self.query_instances(resource).await?,
            "instance_types" => self.query_instance_types(resource).await?,
            "cbs_storages" => self.query_cbs_storages(resource).await?,
            "cbs_snapshots" => self.query_cbs_snapshots(resource).await?,
            "vpc_instances" => self.query_vpc_instances(resource).await?,
            "vpc_subnets" => self.query_vpc_subnets(resource).await?,
            "vpc_route_tables" => self.query_vpc_route_tables(resource).await?,
            "security_groups" => self.query_security_groups(resource).await?,
            "tcaplus_applications" => self.query_tcaplus_applications(resource).await?,
            "tcaplus_zones" => self.query_tcaplus_zones(resource).await?,
            "tcaplus_tables" => self.query_tcaplus_tables(resource).await?,
            "tcaplus_idls" => self.query_tcaplus_idls(resource).await?,
            "tsf_applications" => self.query_tsf_applications(resource).await?,
            other => {
                return Err(ProviderError::new(format!("Unknown data source: {}", other))
                    .for_resource(resource.id.clone()));
            }
        };
        log::debug!(
            "data source {} matched {} objects",
            resource.id.resource_type,
            result.ids.len()
        );
        finish(resource, result)
    }
}

fn finish(resource: &Resource, result: QueryResult) -> ProviderResult<State> {
    let identifier = data_resource_ids_hash(&result.ids);
    let list = serde_json::Value::Array(result.rows);

    if let Some(path) = resource
        .attributes
        .get("result_output_file")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
    {
        output::write_to_file(path, &list)?;
    }

    let mut attributes = resource.attributes.clone();
    attributes.insert(
        result.list_attribute.to_string(),
        Value::from_json(&list).unwrap_or(Value::List(Vec::new())),
    );
    Ok(State::existing(resource.id.clone(), attributes).with_identifier(identifier))
}

/// Text form of a scalar input, as the describe filters expect it
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::List(_) | Value::Map(_) => None,
    }
}

/// Collects the v3 `{Name, Values}` filters of a query
pub(crate) struct Filters<'a> {
    resource: &'a Resource,
    filters: Vec<Filter>,
}

impl<'a> Filters<'a> {
    pub fn new(resource: &'a Resource) -> Self {
        Self {
            resource,
            filters: Vec::new(),
        }
    }

    /// Add `name = [attribute]` when the attribute is set
    pub fn attribute(mut self, key: &str, name: &str) -> Self {
        if let Some(text) = self.resource.attributes.get(key).and_then(scalar_text) {
            self.filters.push(Filter::single(name, text));
        }
        self
    }

    /// Add the raw `filters` map, sorted by filter name
    pub fn generic(mut self) -> Self {
        let Some(map) = self.resource.attributes.get("filters").and_then(Value::as_map) else {
            return self;
        };
        let mut names: Vec<&String> = map.keys().collect();
        names.sort();
        for name in names {
            let values = map[name]
                .as_list()
                .unwrap_or_default()
                .iter()
                .filter_map(scalar_text)
                .collect();
            self.filters.push(Filter::new(name.clone(), values));
        }
        self
    }

    /// The filters, checked against the vendor limits
    pub fn build(self) -> ProviderResult<Vec<Filter>> {
        Ok(build_filters_for_sdk(&self.filters)?)
    }
}

/// Optional string input
pub(crate) fn input<'a>(resource: &'a Resource, key: &str) -> Option<&'a str> {
    resource
        .attributes
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_filters_from_attributes_and_generic_map() {
        let mut generic = HashMap::new();
        generic.insert(
            "tag-key".to_string(),
            Value::from(vec!["env".to_string(), "team".to_string()]),
        );
        generic.insert("instance-state".to_string(), Value::from(vec!["RUNNING".to_string()]));
        let resource = Resource::new("instances", "all")
            .with_attribute("availability_zone", "ap-guangzhou-3")
            .with_attribute("project_id", 0i64)
            .with_attribute("filters", Value::Map(generic));

        let filters = Filters::new(&resource)
            .attribute("availability_zone", "zone")
            .attribute("project_id", "project-id")
            .attribute("vpc_id", "vpc-id")
            .generic()
            .build()
            .unwrap();

        assert_eq!(
            filters,
            vec![
                Filter::single("zone", "ap-guangzhou-3"),
                Filter::single("project-id", "0"),
                Filter::single("instance-state", "RUNNING"),
                Filter::new("tag-key", vec!["env".to_string(), "team".to_string()]),
            ]
        );
    }

    #[test]
    fn test_filters_reject_too_many_values() {
        let values: Vec<String> = (0..6).map(|i| format!("v{}", i)).collect();
        let mut generic = HashMap::new();
        generic.insert("zone".to_string(), Value::from(values));
        let resource =
            Resource::new("instances", "all").with_attribute("filters", Value::Map(generic));

        assert!(Filters::new(&resource).generic().build().is_err());
    }

    #[test]
    fn test_finish_stores_list_and_id() {
        let resource = Resource::new("vpc_instances", "all").with_attribute("name", "main");
        let mut result = QueryResult::new("instance_list");
        result.push("vpc-2", serde_json::json!({"vpc_id": "vpc-2"}));
        result.push("vpc-1", serde_json::json!({"vpc_id": "vpc-1"}));

        let state = finish(&resource, result).unwrap();
        assert!(state.exists);
        assert_eq!(
            state.identifier.as_deref(),
            Some(data_resource_ids_hash(&["vpc-1", "vpc-2"]).as_str())
        );
        assert_eq!(state.attributes.get("name"), Some(&Value::from("main")));
        let list = state.attributes["instance_list"].as_list().unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_finish_writes_result_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subnets.json");
        let resource = Resource::new("vpc_subnets", "all")
            .with_attribute("result_output_file", path.to_str().unwrap());
        let mut result = QueryResult::new("instance_list");
        result.push("subnet-1", serde_json::json!({"subnet_id": "subnet-1"}));

        finish(&resource, result).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!([{"subnet_id": "subnet-1"}]));
    }

    #[test]
    fn test_empty_result_still_has_an_id() {
        let resource = Resource::new("security_groups", "none");
        let state = finish(&resource, QueryResult::new("security_groups")).unwrap();
        assert_eq!(state.identifier.as_deref(), Some(data_resource_ids_hash::<&str>(&[]).as_str()));
        assert_eq!(
            state.attributes.get("security_groups"),
            Some(&Value::List(Vec::new()))
        );
    }
}
