//! TSE schema definitions: `tse_cngw_service` resource

use cirrus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::tse_gateway_id;

pub const TSE_CNGW_SERVICE: &str = "tse_cngw_service";

const PROTOCOLS: &[&str] = &["https", "http", "tcp", "udp"];
const UPSTREAM_TYPES: &[&str] = &["Kubernetes", "Registry", "IPList", "HostIP", "Scf"];
const ALGORITHMS: &[&str] = &["round-robin", "least-connections", "consisten_hashing"];

fn target_block() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("host", AttributeType::String).required(),
        AttributeSchema::new("port", AttributeType::Int).required(),
        AttributeSchema::new("weight", AttributeType::Int).required(),
        AttributeSchema::new("health", AttributeType::String).computed(),
        AttributeSchema::new("created_time", AttributeType::String).computed(),
        AttributeSchema::new("source", AttributeType::String),
    ]
}

fn upstream_info_block() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("host", AttributeType::String)
            .computed()
            .with_description("an IP address or domain name."),
        AttributeSchema::new("port", AttributeType::Int)
            .with_description("backend service port.valid values: `1` to `65535`."),
        AttributeSchema::new("source_id", AttributeType::String)
            .with_description("service source ID."),
        AttributeSchema::new("namespace", AttributeType::String).with_description("namespace."),
        AttributeSchema::new("service_name", AttributeType::String)
            .with_description("the name of the service in registry or kubernetes."),
        AttributeSchema::new("targets", AttributeType::blocks(target_block()))
            .with_description("provided when service type is IPList."),
        AttributeSchema::new("source_type", AttributeType::String)
            .with_description("source service type."),
        AttributeSchema::new("scf_type", AttributeType::String)
            .with_description("scf lambda type."),
        AttributeSchema::new("scf_namespace", AttributeType::String)
            .with_description("scf lambda namespace."),
        AttributeSchema::new("scf_lambda_name", AttributeType::String)
            .with_description("scf lambda name."),
        AttributeSchema::new("slow_start", types::non_negative_int())
            .with_description("slow start time, unit: `second`."),
        AttributeSchema::new("algorithm", types::one_of(ALGORITHMS))
            .computed()
            .with_description("load balance algorithm, default: `round-robin`."),
    ]
}

/// Returns the schema for tse_cngw_service
pub fn tse_cngw_service_schema() -> ResourceSchema {
    ResourceSchema::new(TSE_CNGW_SERVICE)
        .with_description("Provides a resource to create a tse cngw_service")
        .attribute(
            AttributeSchema::new("gateway_id", tse_gateway_id())
                .required()
                .immutable()
                .with_description("gateway ID.")
                .with_provider_name("GatewayId"),
        )
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .immutable()
                .with_description("service name.")
                .with_provider_name("Name"),
        )
        .attribute(
            AttributeSchema::new("protocol", types::one_of(PROTOCOLS))
                .required()
                .with_description("protocol. Reference value:`https`, `http`, `tcp`, `udp`.")
                .with_provider_name("Protocol"),
        )
        .attribute(
            AttributeSchema::new("path", AttributeType::String)
                .required()
                .with_description("path.")
                .with_provider_name("Path"),
        )
        .attribute(
            AttributeSchema::new("timeout", types::positive_int())
                .required()
                .with_description("time out, unit:ms.")
                .with_provider_name("Timeout"),
        )
        .attribute(
            AttributeSchema::new("retries", types::non_negative_int())
                .required()
                .with_description("retry times.")
                .with_provider_name("Retries"),
        )
        .attribute(
            AttributeSchema::new("upstream_type", types::one_of(UPSTREAM_TYPES))
                .required()
                .with_description("service type.")
                .with_provider_name("UpstreamType"),
        )
        .attribute(
            AttributeSchema::new("upstream_info", AttributeType::blocks(upstream_info_block()))
                .required()
                .with_description("service config information.")
                .with_provider_name("UpstreamInfo"),
        )
        .attribute(
            AttributeSchema::new("service_id", AttributeType::String)
                .computed()
                .with_description("service id.")
                .with_provider_name("ID"),
        )
}
