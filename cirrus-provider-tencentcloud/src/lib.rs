//! Cirrus Tencent Cloud Provider
//!
//! Tencent Cloud API Provider implementation.
//!
//! ## Module Structure
//!
//! - `client` - Outbound transport, response envelope and call logging
//! - `services` - Typed request/response facades per product area
//! - `schemas` - Resource and data source schemas
//! - `resources` - Per-type handlers mapping attributes to API calls
//! - `provider` - TencentCloudProvider implementation

pub mod client;
pub mod provider;
pub mod resources;
pub mod schemas;
pub mod services;

// Re-export main types
pub use client::{TencentCloudClient, Transport};
pub use provider::TencentCloudProvider;

use cirrus_core::provider::{BoxFuture, Provider, ProviderResult};
use cirrus_core::resource::{Resource, State};
use cirrus_core::schema::ResourceSchema;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for TencentCloudProvider {
    fn name(&self) -> &'static str {
        "tencentcloud"
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        schemas::all_schemas()
    }

    fn read(&self, state: &State) -> BoxFuture<'_, ProviderResult<State>> {
        let state = state.clone();
        Box::pin(async move { self.read_resource(&state).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&from, &to).await })
    }

    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>> {
        let state = state.clone();
        Box::pin(async move { self.delete_resource(&state).await })
    }

    fn read_data_source(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let query = query.clone();
        Box::pin(async move { self.query_data_source(&query).await })
    }
}
