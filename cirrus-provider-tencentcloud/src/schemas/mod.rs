//! Tencent Cloud resource and data source schema definitions

pub mod dts;
pub mod tse;
pub mod tsf;

use std::sync::LazyLock;

use cirrus_core::resource::Value;
use cirrus_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use cirrus_core::sync::OUTPUT_FILE_ATTR;
use regex::Regex;

static TSF_GROUP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^group-[a-z0-9]+$").expect("Invalid id regex"));
static TSE_GATEWAY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^gateway-[a-z0-9]+$").expect("Invalid id regex"));
static DTS_JOB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^dts-[a-z0-9]+$").expect("Invalid id regex"));
static CLUSTER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^cluster-[a-z0-9]+$").expect("Invalid id regex"));

/// Validate that a string value matches an id pattern
pub fn validate_id_pattern(value: &Value, pattern: &Regex, what: &str) -> Result<(), String> {
    match value {
        Value::String(s) if pattern.is_match(s) => Ok(()),
        Value::String(s) => Err(format!(
            "Invalid {} '{}', expected to match {}",
            what,
            s,
            pattern.as_str()
        )),
        _ => Err("Expected string".to_string()),
    }
}

fn id_type(name: &str, validate: fn(&Value) -> Result<(), String>) -> AttributeType {
    AttributeType::Custom {
        name: name.to_string(),
        base: Box::new(AttributeType::String),
        validate,
    }
}

/// TSF deployment group id, e.g. `group-abc123`
pub fn tsf_group_id() -> AttributeType {
    id_type("TsfGroupId", |v| validate_id_pattern(v, &TSF_GROUP_ID, "group id"))
}

/// TSE gateway id, e.g. `gateway-abc123`
pub fn tse_gateway_id() -> AttributeType {
    id_type("TseGatewayId", |v| validate_id_pattern(v, &TSE_GATEWAY_ID, "gateway id"))
}

/// DTS migration job id, e.g. `dts-abc123`
pub fn dts_job_id() -> AttributeType {
    id_type("DtsJobId", |v| validate_id_pattern(v, &DTS_JOB_ID, "job id"))
}

/// TSF cluster id, e.g. `cluster-abc123`
pub fn cluster_id() -> AttributeType {
    id_type("ClusterId", |v| validate_id_pattern(v, &CLUSTER_ID, "cluster id"))
}

/// Optional snapshot path accepted by data sources
pub fn result_output_file() -> AttributeSchema {
    AttributeSchema::new(OUTPUT_FILE_ATTR, AttributeType::String)
        .with_description("Used to save results.")
}

/// Returns all schemas of this provider
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![
        tsf::tsf_task_schema(),
        tsf::tsf_clusters_schema(),
        tse::tse_cngw_service_schema(),
        dts::dts_migrate_job_schema(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_patterns() {
        assert!(tsf_group_id().validate(&Value::from("group-y8pnmoga")).is_ok());
        assert!(tsf_group_id().validate(&Value::from("grp-1")).is_err());
        assert!(tse_gateway_id().validate(&Value::from("gateway-ddbb709b")).is_ok());
        assert!(dts_job_id().validate(&Value::from("dts-r0ni3qyp")).is_ok());
        assert!(dts_job_id().validate(&Value::from(7i64)).is_err());
        assert!(cluster_id().validate(&Value::from("cluster-vwgj5e6y")).is_ok());
    }

    #[test]
    fn schema_names_are_unique() {
        let schemas = all_schemas();
        let mut names: Vec<&str> = schemas.iter().map(|s| s.resource_type.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), schemas.len());
    }
}
