//! Tencent Cloud Provider implementation
//!
//! Owns the shared client and rate limiter and routes each operation to the
//! handler registered for the resource type.

use std::collections::HashMap;
use std::sync::Arc;

use cirrus_core::api::ErrorClassifier;
use cirrus_core::config::ProviderConfig;
use cirrus_core::lifecycle::{self, DataSourceHandler, OperationContext, ResourceHandler};
use cirrus_core::provider::{ProviderError, ProviderResult};
use cirrus_core::ratelimit::RateLimiter;
use cirrus_core::resource::{Resource, State};

use crate::client::{TencentCloudClient, Transport};
use crate::resources::{
    DtsMigrateJobHandler, TseCngwServiceHandler, TsfClustersHandler, TsfTaskHandler,
};
use crate::schemas::dts::DTS_MIGRATE_JOB;
use crate::schemas::tse::TSE_CNGW_SERVICE;
use crate::schemas::tsf::{TSF_CLUSTERS, TSF_TASK};
use crate::services::{DtsClient, TseClient, TsfClient};

/// Tencent Cloud Provider
pub struct TencentCloudProvider {
    config: ProviderConfig,
    classifier: ErrorClassifier,
    resources: HashMap<&'static str, Arc<dyn ResourceHandler>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSourceHandler>>,
}

impl TencentCloudProvider {
    /// Create a provider sending every call through `transport`
    pub fn new(transport: Arc<dyn Transport>, config: ProviderConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let client = TencentCloudClient::new(transport, limiter);
        let tsf = TsfClient::new(client.clone());

        let mut resources: HashMap<&'static str, Arc<dyn ResourceHandler>> = HashMap::new();
        resources.insert(TSF_TASK, Arc::new(TsfTaskHandler::new(tsf.clone())));
        resources.insert(
            TSE_CNGW_SERVICE,
            Arc::new(TseCngwServiceHandler::new(TseClient::new(client.clone()))),
        );
        resources.insert(
            DTS_MIGRATE_JOB,
            Arc::new(DtsMigrateJobHandler::new(DtsClient::new(client))),
        );

        let mut data_sources: HashMap<&'static str, Arc<dyn DataSourceHandler>> = HashMap::new();
        data_sources.insert(TSF_CLUSTERS, Arc::new(TsfClustersHandler::new(tsf)));

        Self {
            config,
            classifier: ErrorClassifier::default(),
            resources,
            data_sources,
        }
    }

    /// Create a provider configured from the process environment
    pub fn from_env(transport: Arc<dyn Transport>) -> ProviderResult<Self> {
        Ok(Self::new(transport, ProviderConfig::from_env()?))
    }

    /// Fresh context for one operation, with its own log id
    pub fn context(&self) -> OperationContext {
        OperationContext::new(self.config.retry.clone(), self.classifier.clone())
    }

    fn resource_handler(&self, resource_type: &str) -> ProviderResult<&dyn ResourceHandler> {
        self.resources
            .get(resource_type)
            .map(|h| &**h)
            .ok_or_else(|| {
                ProviderError::not_supported(format!("Unknown resource type: {}", resource_type))
            })
    }

    fn data_source_handler(&self, resource_type: &str) -> ProviderResult<&dyn DataSourceHandler> {
        self.data_sources
            .get(resource_type)
            .map(|h| &**h)
            .ok_or_else(|| {
                ProviderError::not_supported(format!("Unknown data source type: {}", resource_type))
            })
    }

    pub async fn read_resource(&self, state: &State) -> ProviderResult<State> {
        let handler = self
            .resource_handler(&state.id.resource_type)
            .map_err(|e| e.for_resource(state.id.clone()))?;
        lifecycle::read(handler, &self.context(), state).await
    }

    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let handler = self
            .resource_handler(&resource.id.resource_type)
            .map_err(|e| e.for_resource(resource.id.clone()))?;
        lifecycle::create(handler, &self.context(), resource).await
    }

    pub async fn update_resource(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        let handler = self
            .resource_handler(&to.id.resource_type)
            .map_err(|e| e.for_resource(to.id.clone()))?;
        lifecycle::update(handler, &self.context(), from, to).await
    }

    pub async fn delete_resource(&self, state: &State) -> ProviderResult<()> {
        let handler = self
            .resource_handler(&state.id.resource_type)
            .map_err(|e| e.for_resource(state.id.clone()))?;
        lifecycle::delete(handler, &self.context(), state).await
    }

    pub async fn query_data_source(&self, query: &Resource) -> ProviderResult<State> {
        let handler = self
            .data_source_handler(&query.id.resource_type)
            .map_err(|e| e.for_resource(query.id.clone()))?;
        lifecycle::read_data_source(handler, &self.context(), query).await
    }
}
