//! DTS (Data Transmission Service) API: migration jobs

use cirrus_core::api::ApiError;
use serde::{Deserialize, Serialize};

use crate::client::{Endpoint, TencentCloudClient};

const ENDPOINT: Endpoint = Endpoint::new("dts", "2021-12-06");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DbItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_db_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DatabaseTableObject {
    pub object_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub databases: Option<Vec<DbItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MigrateOption {
    pub database_table: Option<DatabaseTableObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrate_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_migrate_account: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DbInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Never returned by describe calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DbEndpointInfo {
    pub region: Option<String>,
    pub access_type: Option<String>,
    pub database_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Vec<DbInfo>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyMigrationJobRequest {
    pub job_id: String,
    pub run_mode: String,
    pub migrate_option: MigrateOption,
    pub src_info: DbEndpointInfo,
    pub dst_info: DbEndpointInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expect_run_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_retry_time_range_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobIdRequest {
    pub job_id: String,
}

/// Migration job as returned by DescribeMigrationDetail
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MigrationDetail {
    pub job_id: Option<String>,
    pub job_name: Option<String>,
    pub status: Option<String>,
    pub run_mode: Option<String>,
    pub expect_run_time: Option<String>,
    pub migrate_option: Option<MigrateOption>,
    pub src_info: Option<DbEndpointInfo>,
    pub dst_info: Option<DbEndpointInfo>,
    pub create_time: Option<String>,
    pub auto_retry_time_range_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MigrateCheckJob {
    /// Progress of the check run: `notStarted`, `running` or `finished`
    pub status: Option<String>,
    pub brief_msg: Option<String>,
    /// Verdict once finished: `checkPass` or `checkNotPass`
    pub check_flag: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmptyResponse {
    pub request_id: Option<String>,
}

/// Typed facade over the DTS migration actions this provider uses
#[derive(Clone)]
pub struct DtsClient {
    client: TencentCloudClient,
}

impl DtsClient {
    pub fn new(client: TencentCloudClient) -> Self {
        Self { client }
    }

    pub async fn modify_migration_job(
        &self,
        log_id: &str,
        request: &ModifyMigrationJobRequest,
    ) -> Result<EmptyResponse, ApiError> {
        self.client
            .invoke(log_id, ENDPOINT, "ModifyMigrationJob", request)
            .await
    }

    pub async fn describe_migration_detail(
        &self,
        log_id: &str,
        job_id: &str,
    ) -> Result<MigrationDetail, ApiError> {
        self.job_action(log_id, "DescribeMigrationDetail", job_id).await
    }

    pub async fn create_migrate_check_job(
        &self,
        log_id: &str,
        job_id: &str,
    ) -> Result<EmptyResponse, ApiError> {
        self.job_action(log_id, "CreateMigrateCheckJob", job_id).await
    }

    pub async fn describe_migration_check_job(
        &self,
        log_id: &str,
        job_id: &str,
    ) -> Result<MigrateCheckJob, ApiError> {
        self.job_action(log_id, "DescribeMigrationCheckJob", job_id).await
    }

    pub async fn destroy_migrate_job(
        &self,
        log_id: &str,
        job_id: &str,
    ) -> Result<EmptyResponse, ApiError> {
        self.job_action(log_id, "DestroyMigrateJob", job_id).await
    }

    async fn job_action<Resp>(
        &self,
        log_id: &str,
        action: &str,
        job_id: &str,
    ) -> Result<Resp, ApiError>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let request = JobIdRequest {
            job_id: job_id.to_string(),
        };
        self.client.invoke(log_id, ENDPOINT, action, &request).await
    }
}
