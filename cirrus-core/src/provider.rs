//! Provider - Trait abstracting resource operations
//!
//! A Provider defines operations for a specific cloud platform.
//! It is responsible for converting desired configuration into actual API calls
//! and remote objects back into local state.

use std::future::Future;
use std::pin::Pin;

use crate::api::ApiError;
use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote call failed with an error the apply loop did not retry
    Api,
    /// The retry or poll budget elapsed without reaching a terminal outcome
    Timeout,
    /// Stored identifier cannot be decoded into its components
    BrokenId,
    /// Update attempted to change a field that cannot change after creation
    ImmutableField,
    /// Update changed a force-new field; the object must be destroyed and created again
    RequiresReplacement,
    /// Configuration does not satisfy the resource schema
    Validation,
    /// Unknown resource type or unsupported operation
    NotSupported,
    /// Local file system failure (snapshot file)
    Io,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
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
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotSupported, message)
    }

    pub fn immutable_field(name: &str) -> Self {
        Self::new(
            ErrorKind::ImmutableField,
            format!("argument `{}` cannot be changed", name),
        )
    }

    pub fn requires_replacement(names: &[String]) -> Self {
        let names: Vec<String> = names.iter().map(|n| format!("`{}`", n)).collect();
        Self::new(
            ErrorKind::RequiresReplacement,
            format!("changing argument {} requires replacement", names.join(", ")),
        )
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// The remote error code, if this error came from the API
    pub fn api_code(&self) -> Option<&str> {
        self.cause
            .as_ref()
            .and_then(|c| c.downcast_ref::<ApiError>())
            .map(|e| e.code.as_str())
    }
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        ProviderError::new(ErrorKind::Api, err.to_string()).with_cause(err)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Main Provider trait
///
/// Each cloud provider implements this trait.
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "tencentcloud")
    fn name(&self) -> &'static str;

    /// Schemas of the resource and data source types this Provider can handle
    fn schemas(&self) -> Vec<ResourceSchema>;

    /// Refresh local state from the remote object addressed by `state.identifier`
    ///
    /// Returns the state with its identifier cleared if the object no longer exists.
    fn read(&self, state: &State) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the provider-assigned ID
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>>;

    /// Evaluate a data source query
    fn read_data_source(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        (**self).schemas()
    }

    fn read(&self, state: &State) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(state)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(from, to)
    }

    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(state)
    }

    fn read_data_source(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read_data_source(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn schemas(&self) -> Vec<ResourceSchema> {
            vec![]
        }

        fn read(&self, state: &State) -> BoxFuture<'_, ProviderResult<State>> {
            let mut state = state.clone();
            Box::pin(async move {
                state.clear_identifier();
                Ok(state)
            })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs).with_identifier("mock-id-123")) })
        }

        fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let state = State::existing(to.id.clone(), to.attributes.clone())
                .with_identifier(from.identifier_or_empty());
            Box::pin(async move { Ok(state) })
        }

        fn delete(&self, _state: &State) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn read_data_source(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = query.id.clone();
            Box::pin(async move { Ok(State::existing(id, Default::default())) })
        }
    }

    #[tokio::test]
    async fn boxed_provider_dispatches() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        let resource = Resource::new("test", "example");

        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier, Some("mock-id-123".to_string()));

        let state = provider.read(&state).await.unwrap();
        assert_eq!(state.identifier_or_empty(), "");
    }

    #[test]
    fn error_display_includes_resource() {
        let err = ProviderError::immutable_field("task_id")
            .for_resource(ResourceId::new("tsf_task", "nightly"));
        assert_eq!(
            err.to_string(),
            "[tsf_task.nightly] argument `task_id` cannot be changed"
        );
        assert_eq!(err.kind, ErrorKind::ImmutableField);
    }

    #[test]
    fn requires_replacement_lists_fields() {
        let err = ProviderError::requires_replacement(&["service_id".to_string()]);
        assert_eq!(err.kind, ErrorKind::RequiresReplacement);
        assert_eq!(err.message, "changing argument `service_id` requires replacement");
    }

    #[test]
    fn api_error_keeps_code() {
        let err: ProviderError = ApiError::new("InvalidParameter.Name", "bad name").into();
        assert_eq!(err.kind, ErrorKind::Api);
        assert_eq!(err.api_code(), Some("InvalidParameter.Name"));
    }
}
