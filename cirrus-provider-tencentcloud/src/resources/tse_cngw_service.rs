//! tse_cngw_service - Service behind a TSE cloud native gateway
//!
//! Addressed by `gateway_id#name`. The remote `ID` is only needed for
//! modification and is looked up right before it.

use cirrus_core::identifier::CompositeId;
use cirrus_core::lifecycle::{OperationContext, ResourceHandler};
use cirrus_core::provider::{BoxFuture, ProviderResult};
use cirrus_core::resource::{AttributeReader, Attributes, Resource, Value, set_present};
use cirrus_core::schema::ResourceSchema;

use super::{ResponseError, entry};
use crate::client::not_found_as_none;
use crate::schemas::tse::tse_cngw_service_schema;
use crate::services::TseClient;
use crate::services::tse::{
    CreateServiceRequest, KongServiceDetail, KongTarget, KongUpstreamInfo, ModifyServiceRequest,
    ServiceSpec,
};

pub struct TseCngwServiceHandler {
    tse: TseClient,
}

impl TseCngwServiceHandler {
    pub fn new(tse: TseClient) -> Self {
        Self { tse }
    }

    async fn find(
        &self,
        ctx: &OperationContext,
        gateway_id: &str,
        name: &str,
    ) -> ProviderResult<Option<KongServiceDetail>> {
        let response = ctx
            .read(|| async move {
                not_found_as_none(self.tse.describe_service(&ctx.log_id, gateway_id, name).await)
            })
            .await?;
        Ok(response.and_then(|r| r.result))
    }
}

fn targets(reader: &AttributeReader<'_>) -> ProviderResult<Option<Vec<KongTarget>>> {
    let targets = reader
        .blocks("targets")?
        .iter()
        .map(|target| {
            Ok(KongTarget {
                host: target.string("host")?,
                port: target.int("port")?,
                weight: target.int("weight")?,
                source: target.string("source")?,
                ..Default::default()
            })
        })
        .collect::<ProviderResult<Vec<_>>>()?;
    Ok((!targets.is_empty()).then_some(targets))
}

fn upstream_info(reader: &AttributeReader<'_>) -> ProviderResult<KongUpstreamInfo> {
    Ok(KongUpstreamInfo {
        host: reader.string("host")?,
        port: reader.int("port")?,
        source_id: reader.string("source_id")?,
        namespace: reader.string("namespace")?,
        service_name: reader.string("service_name")?,
        targets: targets(reader)?,
        source_type: reader.string("source_type")?,
        scf_type: reader.string("scf_type")?,
        scf_namespace: reader.string("scf_namespace")?,
        scf_lambda_name: reader.string("scf_lambda_name")?,
        slow_start: reader.int("slow_start")?,
        algorithm: reader.string("algorithm")?,
    })
}

fn service_spec(reader: &AttributeReader<'_>) -> ProviderResult<ServiceSpec> {
    Ok(ServiceSpec {
        protocol: reader.required_string("protocol")?,
        path: reader.required_string("path")?,
        timeout: reader.required_int("timeout")?,
        retries: reader.required_int("retries")?,
        upstream_type: reader.required_string("upstream_type")?,
        upstream_info: reader
            .block("upstream_info")?
            .map(|info| upstream_info(&info))
            .transpose()?
            .unwrap_or_default(),
    })
}

fn upstream_info_value(info: KongUpstreamInfo) -> Value {
    let targets = info.targets.map(|targets| {
        Value::List(
            targets
                .into_iter()
                .map(|target| {
                    Value::Map(entry([
                        ("host", target.host.map(Value::from)),
                        ("port", target.port.map(Value::from)),
                        ("weight", target.weight.map(Value::from)),
                        ("health", target.health.map(Value::from)),
                        ("created_time", target.created_time.map(Value::from)),
                        ("source", target.source.map(Value::from)),
                    ]))
                })
                .collect(),
        )
    });
    Value::block(entry([
        ("host", info.host.map(Value::from)),
        ("port", info.port.map(Value::from)),
        ("source_id", info.source_id.map(Value::from)),
        ("namespace", info.namespace.map(Value::from)),
        ("service_name", info.service_name.map(Value::from)),
        ("targets", targets),
        ("source_type", info.source_type.map(Value::from)),
        ("scf_type", info.scf_type.map(Value::from)),
        ("scf_namespace", info.scf_namespace.map(Value::from)),
        ("scf_lambda_name", info.scf_lambda_name.map(Value::from)),
        ("slow_start", info.slow_start.map(Value::from)),
        ("algorithm", info.algorithm.map(Value::from)),
    ]))
}

fn service_attributes(id: &CompositeId, service: KongServiceDetail) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("gateway_id".to_string(), Value::from(id.part(0)));
    let name = service.name.unwrap_or_else(|| id.part(1).to_string());
    attrs.insert("name".to_string(), Value::from(name));
    set_present(&mut attrs, "service_id", service.id);
    set_present(&mut attrs, "protocol", service.protocol);
    set_present(&mut attrs, "path", service.path);
    set_present(&mut attrs, "timeout", service.timeout);
    set_present(&mut attrs, "retries", service.retries);
    set_present(&mut attrs, "upstream_type", service.upstream_type);
    set_present(&mut attrs, "upstream_info", service.upstream_info.map(upstream_info_value));
    attrs
}

impl ResourceHandler for TseCngwServiceHandler {
    fn schema(&self) -> ResourceSchema {
        tse_cngw_service_schema()
    }

    fn id_arity(&self) -> usize {
        2
    }

    fn create<'a>(
        &'a self,
        ctx: &'a OperationContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<CompositeId>> {
        Box::pin(async move {
            let reader = resource.reader();
            let request = CreateServiceRequest {
                gateway_id: reader.required_string("gateway_id")?,
                name: reader.required_string("name")?,
                spec: service_spec(&reader)?,
            };
            ctx.write(|| self.tse.create_service(&ctx.log_id, &request))
                .await?;
            Ok(CompositeId::new([request.gateway_id, request.name])?)
        })
    }

    fn describe<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
    ) -> BoxFuture<'a, ProviderResult<Option<Attributes>>> {
        Box::pin(async move {
            let service = self.find(ctx, id.part(0), id.part(1)).await?;
            Ok(service.map(|service| service_attributes(id, service)))
        })
    }

    fn update<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
        _changed: &'a [String],
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let (gateway_id, name) = (id.part(0), id.part(1));
            let service_id = self
                .find(ctx, gateway_id, name)
                .await?
                .and_then(|service| service.id)
                .ok_or_else(|| ResponseError::NotFound {
                    what: "gateway service",
                    id: id.encode(),
                })?;

            let request = ModifyServiceRequest {
                gateway_id: gateway_id.to_string(),
                name: name.to_string(),
                id: service_id,
                spec: service_spec(&resource.reader())?,
            };
            ctx.write(|| self.tse.modify_service(&ctx.log_id, &request))
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            ctx.write(|| self.tse.delete_service(&ctx.log_id, id.part(0), id.part(1)))
                .await?;
            Ok(())
        })
    }
}
