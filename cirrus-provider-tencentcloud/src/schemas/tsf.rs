//! TSF schema definitions: `tsf_task` resource and `tsf_clusters` data source

use cirrus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{cluster_id, result_output_file, tsf_group_id};

pub const TSF_TASK: &str = "tsf_task";
pub const TSF_CLUSTERS: &str = "tsf_clusters";

const EXECUTE_TYPES: &[&str] = &["unicast", "broadcast", "shard"];
const RULE_TYPES: &[&str] = &["Cron", "Repeat", "WorkFlow"];
const SUCCESS_OPERATORS: &[&str] = &["GTE", "GT", "LT", "LTE", "EQ"];

/// Returns the schema for tsf_task
pub fn tsf_task_schema() -> ResourceSchema {
    ResourceSchema::new(TSF_TASK)
        .with_description("Provides a resource to create a tsf task")
        .attribute(
            AttributeSchema::new("task_id", AttributeType::String)
                .computed()
                .immutable()
                .with_description("task ID.")
                .with_provider_name("TaskId"),
        )
        .attribute(
            AttributeSchema::new("task_name", AttributeType::String)
                .required()
                .with_description("task name, task length 64 characters.")
                .with_provider_name("TaskName"),
        )
        .attribute(
            AttributeSchema::new("task_content", AttributeType::String)
                .required()
                .with_description("task content, length limit 65536 bytes.")
                .with_provider_name("TaskContent"),
        )
        .attribute(
            AttributeSchema::new("execute_type", types::one_of(EXECUTE_TYPES))
                .required()
                .with_description("execution type, unicast/broadcast/shard.")
                .with_provider_name("ExecuteType"),
        )
        .attribute(
            AttributeSchema::new("task_type", AttributeType::String)
                .required()
                .with_description("task type, java.")
                .with_provider_name("TaskType"),
        )
        .attribute(
            AttributeSchema::new("time_out", types::positive_int())
                .required()
                .with_description("task timeout, time unit ms.")
                .with_provider_name("TimeOut"),
        )
        .attribute(
            AttributeSchema::new("group_id", tsf_group_id())
                .required()
                .with_description("deployment group ID.")
                .with_provider_name("GroupId"),
        )
        .attribute(
            AttributeSchema::new(
                "task_rule",
                AttributeType::blocks(vec![
                    AttributeSchema::new("rule_type", types::one_of(RULE_TYPES)).required(),
                    AttributeSchema::new("expression", AttributeType::String),
                    AttributeSchema::new("repeat_interval", types::non_negative_int()),
                ]),
            )
            .computed()
            .with_description("trigger rule.")
            .with_provider_name("TaskRule"),
        )
        .attribute(
            AttributeSchema::new("retry_count", types::non_negative_int())
                .computed()
                .with_description("number of retries, 0 <= RetryCount<= 10.")
                .with_provider_name("RetryCount"),
        )
        .attribute(
            AttributeSchema::new("retry_interval", types::non_negative_int())
                .computed()
                .with_description("retry interval, 0 <= RetryInterval <= 600000, time unit ms.")
                .with_provider_name("RetryInterval"),
        )
        .attribute(
            AttributeSchema::new("shard_count", types::positive_int())
                .computed()
                .with_description("number of shards.")
                .with_provider_name("ShardCount"),
        )
        .attribute(
            AttributeSchema::new(
                "shard_arguments",
                AttributeType::blocks(vec![
                    AttributeSchema::new("shard_key", AttributeType::Int).required(),
                    AttributeSchema::new("shard_value", AttributeType::String).required(),
                ]),
            )
            .computed()
            .with_description("fragmentation parameters.")
            .with_provider_name("ShardArguments"),
        )
        .attribute(
            AttributeSchema::new("success_operator", types::one_of(SUCCESS_OPERATORS))
                .computed()
                .with_description("the judgment of the success of the broadcast task.")
                .with_provider_name("SuccessOperator"),
        )
        .attribute(
            AttributeSchema::new("success_ratio", AttributeType::String)
                .computed()
                .with_description("the threshold for judging the success rate of the broadcast task.")
                .with_provider_name("SuccessRatio"),
        )
        .attribute(
            AttributeSchema::new(
                "advance_settings",
                AttributeType::blocks(vec![AttributeSchema::new(
                    "sub_task_concurrency",
                    types::positive_int(),
                )]),
            )
            .computed()
            .with_description("advanced settings.")
            .with_provider_name("AdvanceSettings"),
        )
        .attribute(
            AttributeSchema::new("task_argument", AttributeType::String)
                .computed()
                .with_description("task parameters, the length limit is 10000 characters.")
                .with_provider_name("TaskArgument"),
        )
        .attribute(
            AttributeSchema::new("task_state", AttributeType::String)
                .computed()
                .immutable()
                .with_description("Whether to enable the task, ENABLED/DISABLED.")
                .with_provider_name("TaskState"),
        )
        .attribute(
            AttributeSchema::new("belong_flow_ids", types::string_set())
                .computed()
                .immutable()
                .with_description("ID of the workflow to which it belongs.")
                .with_provider_name("BelongFlowIds"),
        )
        .attribute(
            AttributeSchema::new("task_log_id", AttributeType::String)
                .computed()
                .immutable()
                .with_description("task history ID.")
                .with_provider_name("TaskLogId"),
        )
        .attribute(
            AttributeSchema::new("trigger_type", AttributeType::String)
                .computed()
                .immutable()
                .with_description("trigger type.")
                .with_provider_name("TriggerType"),
        )
        .attribute(
            AttributeSchema::new("program_id_list", types::string_set())
                .with_description("Program id list.")
                .with_provider_name("ProgramIdList"),
        )
}

fn cluster_block() -> Vec<AttributeSchema> {
    let string = |name: &str| AttributeSchema::new(name, AttributeType::String).computed();
    let int = |name: &str| AttributeSchema::new(name, AttributeType::Int).computed();
    let float = |name: &str| AttributeSchema::new(name, AttributeType::Float).computed();
    vec![
        string("cluster_id"),
        string("cluster_name"),
        string("cluster_desc"),
        string("cluster_type"),
        string("vpc_id"),
        string("cluster_status"),
        string("cluster_cidr"),
        float("cluster_total_cpu"),
        float("cluster_total_mem"),
        float("cluster_used_cpu"),
        float("cluster_used_mem"),
        int("instance_count"),
        int("run_instance_count"),
        int("normal_instance_count"),
        AttributeSchema::new("delete_flag", AttributeType::Bool).computed(),
        string("create_time"),
        string("update_time"),
        string("tsf_region_id"),
        string("tsf_region_name"),
        string("tsf_zone_id"),
        string("tsf_zone_name"),
        string("cluster_version"),
    ]
}

/// Returns the schema for the tsf_clusters data source
pub fn tsf_clusters_schema() -> ResourceSchema {
    ResourceSchema::data_source(TSF_CLUSTERS)
        .with_description("Use this data source to query detailed information of tsf clusters")
        .attribute(
            AttributeSchema::new("cluster_id_list", AttributeType::Set(Box::new(cluster_id())))
                .with_description("Cluster ID list to be queried.")
                .with_provider_name("ClusterIdList"),
        )
        .attribute(
            AttributeSchema::new("cluster_type", types::one_of(&["C", "V"]))
                .with_description("Cluster type, C: container, V: virtual machine.")
                .with_provider_name("ClusterType"),
        )
        .attribute(
            AttributeSchema::new("search_word", AttributeType::String)
                .with_description("Filter by cluster id or name.")
                .with_provider_name("SearchWord"),
        )
        .attribute(
            AttributeSchema::new("disable_program_auth_check", AttributeType::Bool)
                .with_description("Whether to skip the program permission check.")
                .with_provider_name("DisableProgramAuthCheck"),
        )
        .attribute(
            AttributeSchema::new(
                "result",
                AttributeType::blocks(vec![
                    AttributeSchema::new("total_count", AttributeType::Int).computed(),
                    AttributeSchema::new("content", AttributeType::blocks(cluster_block()))
                        .computed(),
                ]),
            )
            .computed()
            .with_description("Cluster paging information."),
        )
        .attribute(result_output_file())
}
