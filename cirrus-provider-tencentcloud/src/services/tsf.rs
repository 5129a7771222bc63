//! TSF (Tencent Service Framework) API: distributed tasks and clusters

use cirrus_core::api::ApiError;
use serde::{Deserialize, Serialize};

use crate::client::{Endpoint, TencentCloudClient};

const ENDPOINT: Endpoint = Endpoint::new("tsf", "2018-03-26");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_interval: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShardArgument {
    pub shard_key: Option<u64>,
    pub shard_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdvanceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_task_concurrency: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTaskRequest {
    pub task_name: String,
    pub task_content: String,
    pub execute_type: String,
    pub task_type: String,
    pub time_out: u64,
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_rule: Option<TaskRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shard_arguments: Vec<ShardArgument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_operator: Option<String>,
    /// Sent as a string on create, returned as a number on describe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advance_settings: Option<AdvanceSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_argument: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub program_id_list: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTaskResponse {
    /// Id of the new task
    pub result: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyTaskRequest {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_out: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_rule: Option<TaskRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_arguments: Option<Vec<ShardArgument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_ratio: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advance_settings: Option<AdvanceSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_argument: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskIdRequest {
    pub task_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoolResultResponse {
    pub result: Option<bool>,
}

/// Task as returned by DescribeTaskDetail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TaskRecord {
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub task_content: Option<String>,
    pub execute_type: Option<String>,
    pub task_type: Option<String>,
    pub time_out: Option<u64>,
    pub group_id: Option<String>,
    pub task_rule: Option<TaskRule>,
    pub retry_count: Option<u64>,
    pub retry_interval: Option<u64>,
    pub shard_count: Option<i64>,
    pub shard_arguments: Option<Vec<ShardArgument>>,
    pub success_operator: Option<String>,
    pub success_ratio: Option<i64>,
    pub advance_settings: Option<AdvanceSettings>,
    pub task_argument: Option<String>,
    pub task_state: Option<String>,
    pub belong_flow_ids: Option<Vec<String>>,
    pub task_log_id: Option<String>,
    pub trigger_type: Option<String>,
    pub program_id_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTaskDetailResponse {
    pub result: Option<TaskRecord>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeClustersRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cluster_id_list: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_program_auth_check: Option<bool>,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Cluster {
    pub cluster_id: Option<String>,
    pub cluster_name: Option<String>,
    pub cluster_desc: Option<String>,
    pub cluster_type: Option<String>,
    pub vpc_id: Option<String>,
    pub cluster_status: Option<String>,
    #[serde(rename = "ClusterCIDR")]
    pub cluster_cidr: Option<String>,
    pub cluster_total_cpu: Option<f64>,
    pub cluster_total_mem: Option<f64>,
    pub cluster_used_cpu: Option<f64>,
    pub cluster_used_mem: Option<f64>,
    pub instance_count: Option<i64>,
    pub run_instance_count: Option<i64>,
    pub normal_instance_count: Option<i64>,
    pub delete_flag: Option<bool>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
    pub tsf_region_id: Option<String>,
    pub tsf_region_name: Option<String>,
    pub tsf_zone_id: Option<String>,
    pub tsf_zone_name: Option<String>,
    pub cluster_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClusterPage {
    pub total_count: Option<i64>,
    pub content: Option<Vec<Cluster>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeClustersResponse {
    pub result: Option<ClusterPage>,
}

/// Typed facade over the TSF actions this provider uses
#[derive(Clone)]
pub struct TsfClient {
    client: TencentCloudClient,
}

impl TsfClient {
    pub fn new(client: TencentCloudClient) -> Self {
        Self { client }
    }

    pub async fn create_task(
        &self,
        log_id: &str,
        request: &CreateTaskRequest,
    ) -> Result<CreateTaskResponse, ApiError> {
        self.client.invoke(log_id, ENDPOINT, "CreateTask", request).await
    }

    pub async fn describe_task_detail(
        &self,
        log_id: &str,
        task_id: &str,
    ) -> Result<DescribeTaskDetailResponse, ApiError> {
        let request = TaskIdRequest {
            task_id: task_id.to_string(),
        };
        self.client
            .invoke(log_id, ENDPOINT, "DescribeTaskDetail", &request)
            .await
    }

    pub async fn modify_task(
        &self,
        log_id: &str,
        request: &ModifyTaskRequest,
    ) -> Result<BoolResultResponse, ApiError> {
        self.client.invoke(log_id, ENDPOINT, "ModifyTask", request).await
    }

    pub async fn delete_task(
        &self,
        log_id: &str,
        task_id: &str,
    ) -> Result<BoolResultResponse, ApiError> {
        let request = TaskIdRequest {
            task_id: task_id.to_string(),
        };
        self.client.invoke(log_id, ENDPOINT, "DeleteTask", &request).await
    }

    pub async fn describe_clusters(
        &self,
        log_id: &str,
        request: &DescribeClustersRequest,
    ) -> Result<DescribeClustersResponse, ApiError> {
        self.client
            .invoke(log_id, ENDPOINT, "DescribeClusters", request)
            .await
    }
}
