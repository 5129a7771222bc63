//! DTS schema definitions: `dts_migrate_job` resource

use cirrus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::dts_job_id;

pub const DTS_MIGRATE_JOB: &str = "dts_migrate_job";

const RUN_MODES: &[&str] = &["immediate", "timed"];
const OBJECT_MODES: &[&str] = &["all", "partial"];
const MIGRATE_TYPES: &[&str] = &["full", "structure", "fullAndIncrement"];
const ACCESS_TYPES: &[&str] = &[
    "extranet", "cvm", "dcg", "vpncloud", "cdb", "ccn", "intranet", "vpc",
];

fn endpoint_block() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("region", AttributeType::String)
            .required()
            .with_description("Instance region."),
        AttributeSchema::new("access_type", types::one_of(ACCESS_TYPES))
            .required()
            .with_description("Instances network access type."),
        AttributeSchema::new("database_type", AttributeType::String)
            .required()
            .with_description("Database type, such as mysql, redis, mongodb, postgresql, mariadb, percona, etc."),
        AttributeSchema::new("node_type", AttributeType::String)
            .with_description("Node type, simple or cluster."),
        AttributeSchema::new(
            "info",
            AttributeType::blocks(vec![
                AttributeSchema::new("role", AttributeType::String),
                AttributeSchema::new("instance_id", AttributeType::String),
                AttributeSchema::new("user", AttributeType::String),
                AttributeSchema::new("password", AttributeType::String),
            ]),
        )
        .with_description("Database info."),
    ]
}

/// Returns the schema for dts_migrate_job
pub fn dts_migrate_job_schema() -> ResourceSchema {
    ResourceSchema::new(DTS_MIGRATE_JOB)
        .with_description("Provides a resource to create a dts migrate_job")
        .attribute(
            AttributeSchema::new("service_id", dts_job_id())
                .required()
                .force_new()
                .with_description("Migrate service Id from `tencentcloud_dts_migrate_service`.")
                .with_provider_name("JobId"),
        )
        .attribute(
            AttributeSchema::new("status", AttributeType::String)
                .computed()
                .with_description("Migrate job status.")
                .with_provider_name("Status"),
        )
        .attribute(
            AttributeSchema::new("run_mode", types::one_of(RUN_MODES))
                .required()
                .with_description("Run Mode. eg:immediate,timed.")
                .with_provider_name("RunMode"),
        )
        .attribute(
            AttributeSchema::new(
                "migrate_option",
                AttributeType::blocks(vec![
                    AttributeSchema::new(
                        "database_table",
                        AttributeType::blocks(vec![
                            AttributeSchema::new("object_mode", types::one_of(OBJECT_MODES))
                                .required(),
                            AttributeSchema::new(
                                "databases",
                                AttributeType::blocks(vec![
                                    AttributeSchema::new("db_name", AttributeType::String),
                                    AttributeSchema::new("new_db_name", AttributeType::String),
                                    AttributeSchema::new("db_mode", AttributeType::String),
                                    AttributeSchema::new("table_mode", AttributeType::String),
                                ]),
                            ),
                        ]),
                    )
                    .required(),
                    AttributeSchema::new("migrate_type", types::one_of(MIGRATE_TYPES)),
                    AttributeSchema::new("is_migrate_account", AttributeType::Bool),
                ]),
            )
            .required()
            .with_description("Migration job configuration options.")
            .with_provider_name("MigrateOption"),
        )
        .attribute(
            AttributeSchema::new("src_info", AttributeType::blocks(endpoint_block()))
                .required()
                .with_description("Source instance information.")
                .with_provider_name("SrcInfo"),
        )
        .attribute(
            AttributeSchema::new("dst_info", AttributeType::blocks(endpoint_block()))
                .required()
                .with_description("Target instance information.")
                .with_provider_name("DstInfo"),
        )
        .attribute(
            AttributeSchema::new("expect_run_time", AttributeType::String)
                .with_description("Expected start time in the format of `2006-01-02 15:04:05`, required when RunMode is timed.")
                .with_provider_name("ExpectRunTime"),
        )
        .attribute(
            AttributeSchema::new("auto_retry_time_range_minutes", types::non_negative_int())
                .with_description("The automatic retry time period can be set from 5 to 720 minutes, with 0 indicating no retry.")
                .with_provider_name("AutoRetryTimeRangeMinutes"),
        )
}
