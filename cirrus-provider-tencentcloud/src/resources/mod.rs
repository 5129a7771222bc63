//! Resource and data source handlers
//!
//! Each handler maps attributes to typed requests of one service facade and
//! typed responses back to attributes. Control flow lives in
//! [`cirrus_core::lifecycle`].

pub mod dts_migrate_job;
pub mod tse_cngw_service;
pub mod tsf_clusters;
pub mod tsf_task;

use std::collections::HashMap;

use cirrus_core::provider::{ErrorKind, ProviderError, ProviderResult};
use cirrus_core::resource::{AttributeReader, Value};
use thiserror::Error;

pub use dts_migrate_job::DtsMigrateJobHandler;
pub use tse_cngw_service::TseCngwServiceHandler;
pub use tsf_clusters::TsfClustersHandler;
pub use tsf_task::TsfTaskHandler;

/// A response that decoded but lacks what the handler needs
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("{action} returned no {field}")]
    MissingField { action: &'static str, field: &'static str },

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },
}

impl From<ResponseError> for ProviderError {
    fn from(err: ResponseError) -> Self {
        ProviderError::new(ErrorKind::Api, err.to_string()).with_cause(err)
    }
}

/// One nested block entry; absent fields are left out
pub(crate) fn entry<const N: usize>(fields: [(&str, Option<Value>); N]) -> HashMap<String, Value> {
    fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect()
}

/// Non-negative integer attribute for unsigned request fields
pub(crate) fn unsigned(reader: &AttributeReader<'_>, key: &str) -> ProviderResult<Option<u64>> {
    reader
        .int(key)?
        .map(|v| {
            u64::try_from(v).map_err(|_| {
                ProviderError::validation(format!(
                    "Attribute '{}' must not be negative, got {}",
                    key, v
                ))
            })
        })
        .transpose()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use cirrus_core::api::ErrorClassifier;
    use cirrus_core::config::{RateLimitConfig, RetryConfig};
    use cirrus_core::lifecycle::OperationContext;
    use cirrus_core::ratelimit::RateLimiter;

    use crate::client::TencentCloudClient;
    use crate::client::testing::FakeTransport;

    pub fn ctx() -> OperationContext {
        let _ = env_logger::builder().is_test(true).try_init();
        OperationContext::new(
            RetryConfig {
                read_timeout: Duration::from_millis(300),
                write_timeout: Duration::from_millis(300),
                min_interval: Duration::from_millis(5),
                max_interval: Duration::from_millis(20),
            },
            ErrorClassifier::default(),
        )
    }

    pub fn client(transport: &Arc<FakeTransport>) -> TencentCloudClient {
        TencentCloudClient::new(
            transport.clone(),
            Arc::new(RateLimiter::new(RateLimitConfig::default())),
        )
    }
}
