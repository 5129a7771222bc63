//! Outbound client for the Tencent Cloud management API
//!
//! Signing and HTTP live behind [`Transport`]. This module adds the parts every
//! call shares: rate limiting by action, the `{"Response": ...}` envelope and
//! request/response logging.

use std::sync::Arc;

use cirrus_core::api::ApiError;
use cirrus_core::provider::BoxFuture;
use cirrus_core::ratelimit::RateLimiter;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Sends one API action and returns the raw response document.
///
/// Only transport failures are errors here; API errors come back inside the
/// response envelope.
pub trait Transport: Send + Sync {
    fn call<'a>(
        &'a self,
        service: &'a str,
        version: &'a str,
        action: &'a str,
        body: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, ApiError>>;
}

/// Service name and API version of a product area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub service: &'static str,
    pub version: &'static str,
}

impl Endpoint {
    pub const fn new(service: &'static str, version: &'static str) -> Self {
        Self { service, version }
    }
}

/// Shared client handed to every service facade
#[derive(Clone)]
pub struct TencentCloudClient {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
}

impl TencentCloudClient {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateLimiter>) -> Self {
        Self { transport, limiter }
    }

    /// Call `action` with a typed request and decode the typed response
    pub async fn invoke<Req, Resp>(
        &self,
        log_id: &str,
        endpoint: Endpoint,
        action: &str,
        request: &Req,
    ) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::parse(format!("failed to encode {} request: {}", action, e)))?;
        let request_body = body.to_string();

        self.limiter.check(action).await;

        let result = self
            .transport
            .call(endpoint.service, endpoint.version, action, body)
            .await
            .and_then(unwrap_envelope);

        match result {
            Ok(response) => {
                log::debug!(
                    "[DEBUG]{} api[{}] success, request body [{}], response body [{}]",
                    log_id,
                    action,
                    request_body,
                    response
                );
                serde_json::from_value(response).map_err(|e| {
                    ApiError::parse(format!("failed to decode {} response: {}", action, e))
                })
            }
            Err(err) => {
                log::error!(
                    "[CRITICAL]{} api[{}] fail, request body [{}], reason[{}]",
                    log_id,
                    action,
                    request_body,
                    err
                );
                Err(err)
            }
        }
    }
}

/// Extract the payload of a `{"Response": {...}}` document, turning an
/// embedded `Error` into an [`ApiError`]
fn unwrap_envelope(document: serde_json::Value) -> Result<serde_json::Value, ApiError> {
    let serde_json::Value::Object(mut outer) = document else {
        return Err(ApiError::parse("response is not a JSON object"));
    };
    let Some(response) = outer.remove("Response") else {
        return Err(ApiError::parse("response has no Response field"));
    };

    let request_id = response
        .get("RequestId")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    if let Some(error) = response.get("Error") {
        let code = error.get("Code").and_then(|v| v.as_str()).unwrap_or("InternalError");
        let message = error.get("Message").and_then(|v| v.as_str()).unwrap_or("");
        let mut err = ApiError::new(code, message);
        if let Some(id) = request_id {
            err = err.with_request_id(id);
        }
        return Err(err);
    }
    Ok(response)
}

/// Treat a `ResourceNotFound` error from a describe call as "no object"
pub fn not_found_as_none<T>(result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_code("ResourceNotFound") => Ok(None),
        Err(err) => Err(err),
    }
}
