//! Provider - Trait abstracting resource operations
//!
//! A Provider maps resource declarations onto the API calls of one cloud.
//! It owns no state: callers keep the last observed `State` and hand it back
//! on update and delete.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{Resource, ResourceId, State};
use crate::schema::{ResourceSchema, TypeError};
use crate::waiter::WaitError;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    /// Vendor error code, when the failure came from the cloud API
    pub code: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            code: None,
            cause: None,
        }
    }

    /// Attribute validation failures, one line per error
    pub fn validation(errors: &[TypeError]) -> Self {
        let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        Self::new(format!("Invalid attributes: {}", lines.join("; ")))
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl From<WaitError> for ProviderError {
    fn from(err: WaitError) -> Self {
        ProviderError::new(err.to_string()).with_cause(err)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "cbs_storage")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "tencentcloud")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can manage
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// List of data sources this Provider can query
    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// Returns `State::not_found()` if the resource does not exist or no
    /// identifier is known.
    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the vendor ID (e.g., vpc-xxx)
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    ///
    /// Fails when a changed attribute can only be applied by replacement.
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    ///
    /// `from` is the last known state; some deletions depend on its attributes.
    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
    ) -> BoxFuture<'_, ProviderResult<()>>;

    /// Run a data source query
    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Adopt an existing resource by its identifier
    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            let state = self.read(&id, Some(&identifier)).await?;
            if state.exists {
                Ok(state)
            } else {
                Err(ProviderError::new(format!("Cannot import non-existent {}", identifier))
                    .for_resource(id))
            }
        })
    }
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).data_source_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, identifier, from)
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read_data_source(resource)
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::resource::Value;

    /// Serves a fixed set of disks keyed by disk id
    struct StaticDisks {
        disks: HashMap<String, HashMap<String, Value>>,
    }

    impl StaticDisks {
        fn with_disk(disk_id: &str, size: i64) -> Self {
            let mut attrs = HashMap::new();
            attrs.insert("storage_size".to_string(), Value::Int(size));
            let mut disks = HashMap::new();
            disks.insert(disk_id.to_string(), attrs);
            Self { disks }
        }
    }

    impl Provider for StaticDisks {
        fn name(&self) -> &'static str {
            "static"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            Vec::new()
        }

        fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
            Vec::new()
        }

        fn read(
            &self,
            id: &ResourceId,
            identifier: Option<&str>,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let found = identifier.and_then(|disk_id| {
                self.disks
                    .get(disk_id)
                    .map(|attrs| (disk_id.to_string(), attrs.clone()))
            });
            Box::pin(async move {
                Ok(match found {
                    Some((disk_id, attrs)) => State::existing(id, attrs).with_identifier(disk_id),
                    None => State::not_found(id),
                })
            })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            Box::pin(async move { Err(ProviderError::new("read-only").for_resource(id)) })
        }

        fn update(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _from: &State,
            _to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            Box::pin(async move { Err(ProviderError::new("read-only").for_resource(id)) })
        }

        fn delete(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _from: &State,
        ) -> BoxFuture<'_, ProviderResult<()>> {
            let id = id.clone();
            Box::pin(async move { Err(ProviderError::new("read-only").for_resource(id)) })
        }

        fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            Box::pin(async move { Ok(State::existing(id, HashMap::new())) })
        }
    }

    #[tokio::test]
    async fn test_import_adopts_existing_disk() {
        let provider: Box<dyn Provider> = Box::new(StaticDisks::with_disk("disk-1", 50));
        let id = ResourceId::new("cbs_storage", "data");

        let state = provider.import(&id, "disk-1").await.unwrap();
        assert_eq!(state.identifier.as_deref(), Some("disk-1"));
        assert_eq!(state.attributes.get("storage_size"), Some(&Value::Int(50)));
    }

    #[tokio::test]
    async fn test_import_rejects_missing_disk() {
        let provider = StaticDisks::with_disk("disk-1", 50);
        let id = ResourceId::new("cbs_storage", "data");

        let err = provider.import(&id, "disk-2").await.unwrap_err();
        assert_eq!(err.resource_id, Some(id));
        assert_eq!(
            err.to_string(),
            "[cbs_storage.data] Cannot import non-existent disk-2"
        );
    }

    #[test]
    fn test_error_display_and_code() {
        let err = ProviderError::new("boom")
            .for_resource(ResourceId::new("vpc", "main"))
            .with_code("InternalError");
        assert_eq!(err.to_string(), "[vpc.main] boom");
        assert_eq!(err.code.as_deref(), Some("InternalError"));
    }

    #[test]
    fn test_validation_error_lists_every_problem() {
        let err = ProviderError::validation(&[
            TypeError::MissingRequired {
                name: "cidr_block".to_string(),
            },
            TypeError::ComputedOnly {
                name: "create_time".to_string(),
            },
        ]);
        assert_eq!(
            err.message,
            "Invalid attributes: Required attribute 'cidr_block' is missing; \
             Attribute 'create_time' is computed and cannot be set"
        );
    }

    #[test]
    fn test_wait_error_keeps_cause() {
        let err: ProviderError = WaitError::NotFound {
            description: "disk disk-1".to_string(),
        }
        .into();
        assert_eq!(err.message, "disk disk-1 not found");
        assert!(std::error::Error::source(&err).is_some());
    }
}
