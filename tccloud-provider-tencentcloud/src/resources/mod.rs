//! CRUD handlers of the managed resource types
//!
//! Each submodule adds `read_*`, `create_*`, `update_*` and `delete_*`
//! methods to [`TencentCloudProvider`](crate::TencentCloudProvider). Inputs
//! have already been validated and defaulted by the dispatcher.

mod cbs;
mod cvm;
mod tcaplus;
mod tsf;
mod vpc;

use std::collections::HashMap;

use tccloud_core::provider::{ProviderError, ProviderResult};
use tccloud_core::resource::{AttributesExt, Resource, State, Value};
use tccloud_core::waiter::{CheckError, Observation, Poll, READ_RETRY_TIMEOUT, Waiter};

use crate::error::ApiError;
use crate::schemas;
use crate::services::Tag;

pub(crate) fn required_str<'a>(resource: &'a Resource, key: &str) -> ProviderResult<&'a str> {
    resource.attributes.string(key).ok_or_else(|| {
        ProviderError::new(format!("{} is required", key)).for_resource(resource.id.clone())
    })
}

pub(crate) fn required_int(resource: &Resource, key: &str) -> ProviderResult<i64> {
    resource.attributes.int(key).ok_or_else(|| {
        ProviderError::new(format!("{} is required", key)).for_resource(resource.id.clone())
    })
}

/// The attribute is declared and differs from the prior state
pub(crate) fn changed(from: &State, to: &Resource, key: &str) -> bool {
    match to.attributes.get(key) {
        Some(value) => from.attributes.get(key) != Some(value),
        None => false,
    }
}

/// State after a mutation: the fresh read plus the declared write-only
/// attributes of the resource type
pub(crate) fn settled(state: State, desired: &Resource) -> ProviderResult<State> {
    if !state.exists {
        return Err(
            ProviderError::new("resource is not visible after the write")
                .for_resource(desired.id.clone()),
        );
    }
    let mut state = state;
    if let Some(schema) = schemas::resource_schema(&desired.id.resource_type) {
        for key in schema.write_only_attributes() {
            if let Some(value) = desired.attributes.get(key) {
                state.attributes.insert(key.to_string(), value.clone());
            }
        }
    }
    Ok(state)
}

/// Treat a not-found vendor error like an empty describe result
pub(crate) fn tolerate_not_found<T>(result: Result<Option<T>, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Err(e) if e.is_not_found() => Ok(None),
        other => other,
    }
}

/// Waiter observation of a describe result
pub(crate) fn observe<T>(item: Option<T>, status: impl FnOnce(T) -> String) -> Observation {
    item.map_or(Observation::NotFound, |item| Observation::Found(status(item)))
}

/// Poll a describe until the object shows up after a create
pub(crate) async fn wait_visible<T, F, Fut>(description: String, mut describe: F) -> ProviderResult<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, ApiError>>,
{
    Waiter::new(description)
        .timeout(READ_RETRY_TIMEOUT)
        .until(|| {
            let described = describe();
            async move {
                Ok::<_, CheckError>(match described.await? {
                    Some(_) => Poll::Ready(()),
                    None => Poll::Pending("NOT_FOUND".to_string()),
                })
            }
        })
        .await?;
    Ok(())
}

/// Deletion that is already done counts as success
pub(crate) fn deleted(result: Result<(), ApiError>) -> ProviderResult<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => Ok(other?),
    }
}

pub(crate) fn tags_value(tags: &[Tag]) -> Value {
    Value::Map(
        tags.iter()
            .map(|t| (t.key.clone(), Value::String(t.value.clone())))
            .collect(),
    )
}

/// Insert a string attribute unless the vendor left it empty
pub(crate) fn insert_non_empty(attributes: &mut HashMap<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        attributes.insert(key.to_string(), Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tccloud_core::resource::ResourceId;

    #[test]
    fn test_changed_ignores_undeclared_attributes() {
        let id = ResourceId::new("vpc", "main");
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from("main"));
        attrs.insert("dns_servers".to_string(), Value::from(vec!["1.1.1.1".to_string()]));
        let from = State::existing(id, attrs);

        let to = Resource::new("vpc", "main").with_attribute("name", "renamed");
        assert!(changed(&from, &to, "name"));
        assert!(!changed(&from, &to, "dns_servers"));
    }

    #[test]
    fn test_settled_keeps_write_only_inputs() {
        let id = ResourceId::new("instance", "web");
        let state = State::existing(id, HashMap::new()).with_identifier("ins-1");
        let desired = Resource::new("instance", "web")
            .with_attribute("password", "Passw0rd!")
            .with_attribute("instance_name", "web");

        let state = settled(state, &desired).unwrap();
        assert_eq!(state.attributes.get("password"), Some(&Value::from("Passw0rd!")));
        assert!(!state.attributes.contains_key("hostname"));
        assert!(!state.attributes.contains_key("instance_name"));
    }

    #[test]
    fn test_settled_rejects_missing_state() {
        let desired = Resource::new("vpc", "main");
        let err = settled(State::not_found(desired.id.clone()), &desired).unwrap_err();
        assert_eq!(err.resource_id, Some(desired.id));
    }

    #[test]
    fn test_tolerate_not_found() {
        let gone: Result<Option<()>, _> = Err(ApiError::vendor("ResourceNotFound", "gone", "r"));
        assert!(tolerate_not_found(gone).unwrap().is_none());

        let denied: Result<Option<()>, _> = Err(ApiError::vendor("AuthFailure", "denied", "r"));
        assert!(tolerate_not_found(denied).is_err());
    }
}
