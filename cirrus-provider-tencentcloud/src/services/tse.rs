//! TSE (Tencent Service Engine) API: cloud native gateway services

use cirrus_core::api::ApiError;
use serde::{Deserialize, Serialize};

use crate::client::{Endpoint, TencentCloudClient};

const ENDPOINT: Endpoint = Endpoint::new("tse", "2020-12-07");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct KongTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    /// Computed by the gateway
    #[serde(skip_serializing)]
    pub health: Option<String>,
    #[serde(skip_serializing)]
    pub created_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct KongUpstreamInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(rename = "SourceID", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<KongTarget>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scf_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scf_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scf_lambda_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// Mutable part of a gateway service, shared by create and modify
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSpec {
    pub protocol: String,
    pub path: String,
    pub timeout: i64,
    pub retries: i64,
    pub upstream_type: String,
    pub upstream_info: KongUpstreamInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateServiceRequest {
    pub gateway_id: String,
    pub name: String,
    #[serde(flatten)]
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyServiceRequest {
    pub gateway_id: String,
    pub name: String,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(flatten)]
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceKeyRequest {
    pub gateway_id: String,
    pub name: String,
}

/// Gateway service as returned by DescribeOneCloudNativeAPIGatewayService
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct KongServiceDetail {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub protocol: Option<String>,
    pub path: Option<String>,
    pub timeout: Option<i64>,
    pub retries: Option<i64>,
    pub upstream_type: Option<String>,
    pub upstream_info: Option<KongUpstreamInfo>,
    pub created_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeServiceResponse {
    pub result: Option<KongServiceDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmptyResponse {
    pub request_id: Option<String>,
}

/// Typed facade over the TSE gateway actions this provider uses
#[derive(Clone)]
pub struct TseClient {
    client: TencentCloudClient,
}

impl TseClient {
    pub fn new(client: TencentCloudClient) -> Self {
        Self { client }
    }

    pub async fn create_service(
        &self,
        log_id: &str,
        request: &CreateServiceRequest,
    ) -> Result<EmptyResponse, ApiError> {
        self.client
            .invoke(log_id, ENDPOINT, "CreateCloudNativeAPIGatewayService", request)
            .await
    }

    pub async fn describe_service(
        &self,
        log_id: &str,
        gateway_id: &str,
        name: &str,
    ) -> Result<DescribeServiceResponse, ApiError> {
        let request = ServiceKeyRequest {
            gateway_id: gateway_id.to_string(),
            name: name.to_string(),
        };
        self.client
            .invoke(log_id, ENDPOINT, "DescribeOneCloudNativeAPIGatewayService", &request)
            .await
    }

    pub async fn modify_service(
        &self,
        log_id: &str,
        request: &ModifyServiceRequest,
    ) -> Result<EmptyResponse, ApiError> {
        self.client
            .invoke(log_id, ENDPOINT, "ModifyCloudNativeAPIGatewayService", request)
            .await
    }

    pub async fn delete_service(
        &self,
        log_id: &str,
        gateway_id: &str,
        name: &str,
    ) -> Result<EmptyResponse, ApiError> {
        let request = ServiceKeyRequest {
            gateway_id: gateway_id.to_string(),
            name: name.to_string(),
        };
        self.client
            .invoke(log_id, ENDPOINT, "DeleteCloudNativeAPIGatewayService", &request)
            .await
    }
}
