//! tsf_clusters - Query TSF clusters

use cirrus_core::lifecycle::{DataSourceHandler, OperationContext, QueryResult};
use cirrus_core::provider::{BoxFuture, ProviderResult};
use cirrus_core::resource::{AttributeReader, Attributes, Resource, Value};
use cirrus_core::schema::ResourceSchema;

use super::entry;
use crate::schemas::tsf::tsf_clusters_schema;
use crate::services::TsfClient;
use crate::services::tsf::{Cluster, DescribeClustersRequest};

const PAGE_SIZE: i64 = 20;

pub struct TsfClustersHandler {
    tsf: TsfClient,
}

impl TsfClustersHandler {
    pub fn new(tsf: TsfClient) -> Self {
        Self { tsf }
    }

    /// Fetch every page matching the filters in `request`
    async fn all_clusters(
        &self,
        ctx: &OperationContext,
        mut request: DescribeClustersRequest,
    ) -> ProviderResult<(i64, Vec<Cluster>)> {
        let mut clusters = Vec::new();
        request.limit = PAGE_SIZE;
        loop {
            request.offset = clusters.len() as i64;
            let page = ctx
                .read(|| self.tsf.describe_clusters(&ctx.log_id, &request))
                .await?
                .result
                .unwrap_or_default();
            let content = page.content.unwrap_or_default();
            let fetched = content.len() as i64;
            clusters.extend(content);

            let fetched_all = page
                .total_count
                .is_some_and(|total| clusters.len() as i64 >= total);
            if fetched < PAGE_SIZE || fetched_all {
                let total = page.total_count.unwrap_or_default();
                return Ok((total.max(clusters.len() as i64), clusters));
            }
        }
    }
}

fn filters(reader: &AttributeReader<'_>) -> ProviderResult<DescribeClustersRequest> {
    Ok(DescribeClustersRequest {
        cluster_id_list: reader.strings("cluster_id_list")?,
        cluster_type: reader.string("cluster_type")?,
        search_word: reader.string("search_word")?,
        disable_program_auth_check: reader.bool("disable_program_auth_check")?,
        ..Default::default()
    })
}

fn cluster_value(cluster: Cluster) -> Value {
    Value::Map(entry([
        ("cluster_id", cluster.cluster_id.map(Value::from)),
        ("cluster_name", cluster.cluster_name.map(Value::from)),
        ("cluster_desc", cluster.cluster_desc.map(Value::from)),
        ("cluster_type", cluster.cluster_type.map(Value::from)),
        ("vpc_id", cluster.vpc_id.map(Value::from)),
        ("cluster_status", cluster.cluster_status.map(Value::from)),
        ("cluster_cidr", cluster.cluster_cidr.map(Value::from)),
        ("cluster_total_cpu", cluster.cluster_total_cpu.map(Value::from)),
        ("cluster_total_mem", cluster.cluster_total_mem.map(Value::from)),
        ("cluster_used_cpu", cluster.cluster_used_cpu.map(Value::from)),
        ("cluster_used_mem", cluster.cluster_used_mem.map(Value::from)),
        ("instance_count", cluster.instance_count.map(Value::from)),
        ("run_instance_count", cluster.run_instance_count.map(Value::from)),
        ("normal_instance_count", cluster.normal_instance_count.map(Value::from)),
        ("delete_flag", cluster.delete_flag.map(Value::from)),
        ("create_time", cluster.create_time.map(Value::from)),
        ("update_time", cluster.update_time.map(Value::from)),
        ("tsf_region_id", cluster.tsf_region_id.map(Value::from)),
        ("tsf_region_name", cluster.tsf_region_name.map(Value::from)),
        ("tsf_zone_id", cluster.tsf_zone_id.map(Value::from)),
        ("tsf_zone_name", cluster.tsf_zone_name.map(Value::from)),
        ("cluster_version", cluster.cluster_version.map(Value::from)),
    ]))
}

impl DataSourceHandler for TsfClustersHandler {
    fn schema(&self) -> ResourceSchema {
        tsf_clusters_schema()
    }

    fn query<'a>(
        &'a self,
        ctx: &'a OperationContext,
        query: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<QueryResult>> {
        Box::pin(async move {
            let request = filters(&query.reader())?;
            let (total, clusters) = self.all_clusters(ctx, request).await?;

            let ids: Vec<String> = clusters
                .iter()
                .filter_map(|cluster| cluster.cluster_id.clone())
                .collect();
            let result = Value::block(entry([
                ("total_count", Some(Value::from(total))),
                (
                    "content",
                    Some(Value::List(clusters.into_iter().map(cluster_value).collect())),
                ),
            ]));
            let snapshot = result.to_json();

            let mut attributes = Attributes::new();
            attributes.insert("result".to_string(), result);
            Ok(QueryResult {
                ids,
                attributes,
                snapshot,
            })
        })
    }
}
