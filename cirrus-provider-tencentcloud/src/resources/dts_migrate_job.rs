//! dts_migrate_job - Configure, check and remove a DTS migration job
//!
//! The job itself is created elsewhere; this resource adopts it by id.
//! Create and Update run the same flow: configure the job, wait for it to
//! settle, then run the pre-migration check and wait for a passing verdict.

use cirrus_core::api::ApiError;
use cirrus_core::identifier::CompositeId;
use cirrus_core::lifecycle::{OperationContext, ResourceHandler};
use cirrus_core::provider::{BoxFuture, ProviderResult};
use cirrus_core::resource::{AttributeReader, Attributes, Resource, Value, set_present};
use cirrus_core::retry::StatusWait;
use cirrus_core::schema::ResourceSchema;

use super::entry;
use crate::client::not_found_as_none;
use crate::schemas::dts::dts_migrate_job_schema;
use crate::services::DtsClient;
use crate::services::dts::{
    DatabaseTableObject, DbEndpointInfo, DbInfo, DbItem, MigrateOption, MigrationDetail,
    ModifyMigrationJobRequest,
};

const JOB_CREATED: &str = "created";
const JOB_FAILED: &str = "failed";
const CHECK_FINISHED: &str = "finished";
const CHECK_PASS: &str = "checkPass";
const CHECK_NOT_PASS: &str = "checkNotPass";

/// Returned while a freshly configured job is still being saved
const STATUS_IN_CONFLICT: &str = "UnsupportedOperation.StatusInConflict";

pub struct DtsMigrateJobHandler {
    dts: DtsClient,
}

impl DtsMigrateJobHandler {
    pub fn new(dts: DtsClient) -> Self {
        Self { dts }
    }

    /// One describe call, not-found as `None`
    async fn describe_once(
        &self,
        ctx: &OperationContext,
        job_id: &str,
    ) -> Result<Option<MigrationDetail>, ApiError> {
        not_found_as_none(self.dts.describe_migration_detail(&ctx.log_id, job_id).await)
    }

    async fn find(
        &self,
        ctx: &OperationContext,
        job_id: &str,
    ) -> ProviderResult<Option<MigrationDetail>> {
        ctx.read(|| self.describe_once(ctx, job_id)).await
    }

    async fn status(
        &self,
        ctx: &OperationContext,
        job_id: &str,
    ) -> Result<Option<String>, ApiError> {
        Ok(self.describe_once(ctx, job_id).await?.and_then(|job| job.status))
    }

    async fn exists(&self, ctx: &OperationContext, job_id: &str) -> Result<bool, ApiError> {
        Ok(self.describe_once(ctx, job_id).await?.is_some())
    }

    /// Progress of the check run, replaced by its verdict once finished
    async fn check_progress(
        &self,
        ctx: &OperationContext,
        job_id: &str,
    ) -> Result<Option<String>, ApiError> {
        let check = self.dts.describe_migration_check_job(&ctx.log_id, job_id).await?;
        Ok(match check.status.as_deref() {
            Some(CHECK_FINISHED) => check.check_flag,
            _ => check.status,
        })
    }

    /// Modify, wait for `created`, check, wait for `checkPass`
    async fn configure(
        &self,
        ctx: &OperationContext,
        job_id: &str,
        resource: &Resource,
    ) -> ProviderResult<()> {
        let request = modify_request(job_id, &resource.reader())?;
        ctx.write(|| self.dts.modify_migration_job(&ctx.log_id, &request))
            .await?;

        let settled = StatusWait::until([JOB_CREATED]).failing_on([JOB_FAILED]);
        ctx.wait_for_status(&settled, || self.status(ctx, job_id))
            .await?;

        ctx.write_retrying(&[STATUS_IN_CONFLICT], || {
            self.dts.create_migrate_check_job(&ctx.log_id, job_id)
        })
        .await?;

        let verdict = StatusWait::until([CHECK_PASS]).failing_on([CHECK_NOT_PASS]);
        let flag = ctx
            .wait_for_status(&verdict, || self.check_progress(ctx, job_id))
            .await?;
        log::info!("{} migrate job {} check verdict: {}", ctx.log_id, job_id, flag);
        Ok(())
    }
}

fn databases(reader: &AttributeReader<'_>) -> ProviderResult<Option<Vec<DbItem>>> {
    let items = reader
        .blocks("databases")?
        .iter()
        .map(|db| {
            Ok(DbItem {
                db_name: db.string("db_name")?,
                new_db_name: db.string("new_db_name")?,
                db_mode: db.string("db_mode")?,
                table_mode: db.string("table_mode")?,
            })
        })
        .collect::<ProviderResult<Vec<_>>>()?;
    Ok((!items.is_empty()).then_some(items))
}

fn database_table(reader: &AttributeReader<'_>) -> ProviderResult<Option<DatabaseTableObject>> {
    let Some(table) = reader.block("database_table")? else {
        return Ok(None);
    };
    Ok(Some(DatabaseTableObject {
        object_mode: table.string("object_mode")?,
        databases: databases(&table)?,
    }))
}

fn migrate_option(reader: &AttributeReader<'_>) -> ProviderResult<MigrateOption> {
    let Some(option) = reader.block("migrate_option")? else {
        return Ok(MigrateOption::default());
    };
    Ok(MigrateOption {
        database_table: database_table(&option)?,
        migrate_type: option.string("migrate_type")?,
        is_migrate_account: option.bool("is_migrate_account")?,
    })
}

fn endpoint_info(reader: &AttributeReader<'_>, key: &str) -> ProviderResult<DbEndpointInfo> {
    let Some(endpoint) = reader.block(key)? else {
        return Ok(DbEndpointInfo::default());
    };
    let info = endpoint
        .blocks("info")?
        .iter()
        .map(|db| {
            Ok(DbInfo {
                role: db.string("role")?,
                instance_id: db.string("instance_id")?,
                user: db.string("user")?,
                password: db.string("password")?,
            })
        })
        .collect::<ProviderResult<Vec<_>>>()?;
    Ok(DbEndpointInfo {
        region: endpoint.string("region")?,
        access_type: endpoint.string("access_type")?,
        database_type: endpoint.string("database_type")?,
        node_type: endpoint.string("node_type")?,
        info: (!info.is_empty()).then_some(info),
    })
}

fn modify_request(
    job_id: &str,
    reader: &AttributeReader<'_>,
) -> ProviderResult<ModifyMigrationJobRequest> {
    Ok(ModifyMigrationJobRequest {
        job_id: job_id.to_string(),
        run_mode: reader.required_string("run_mode")?,
        migrate_option: migrate_option(reader)?,
        src_info: endpoint_info(reader, "src_info")?,
        dst_info: endpoint_info(reader, "dst_info")?,
        expect_run_time: reader.string("expect_run_time")?,
        auto_retry_time_range_minutes: reader.int("auto_retry_time_range_minutes")?,
    })
}

fn migrate_option_value(option: MigrateOption) -> Value {
    let database_table = option.database_table.map(|table| {
        let databases = table.databases.map(|items| {
            Value::List(
                items
                    .into_iter()
                    .map(|db| {
                        Value::Map(entry([
                            ("db_name", db.db_name.map(Value::from)),
                            ("new_db_name", db.new_db_name.map(Value::from)),
                            ("db_mode", db.db_mode.map(Value::from)),
                            ("table_mode", db.table_mode.map(Value::from)),
                        ]))
                    })
                    .collect(),
            )
        });
        Value::block(entry([
            ("object_mode", table.object_mode.map(Value::from)),
            ("databases", databases),
        ]))
    });
    Value::block(entry([
        ("database_table", database_table),
        ("migrate_type", option.migrate_type.map(Value::from)),
        ("is_migrate_account", option.is_migrate_account.map(Value::from)),
    ]))
}

fn endpoint_value(endpoint: DbEndpointInfo) -> Value {
    let info = endpoint.info.map(|info| {
        Value::List(
            info.into_iter()
                .map(|db| {
                    Value::Map(entry([
                        ("role", db.role.map(Value::from)),
                        ("instance_id", db.instance_id.map(Value::from)),
                        ("user", db.user.map(Value::from)),
                        ("password", db.password.map(Value::from)),
                    ]))
                })
                .collect(),
        )
    });
    Value::block(entry([
        ("region", endpoint.region.map(Value::from)),
        ("access_type", endpoint.access_type.map(Value::from)),
        ("database_type", endpoint.database_type.map(Value::from)),
        ("node_type", endpoint.node_type.map(Value::from)),
        ("info", info),
    ]))
}

fn job_attributes(job: MigrationDetail) -> Attributes {
    let mut attrs = Attributes::new();
    set_present(&mut attrs, "service_id", job.job_id);
    set_present(&mut attrs, "status", job.status);
    set_present(&mut attrs, "run_mode", job.run_mode);
    set_present(&mut attrs, "expect_run_time", job.expect_run_time);
    set_present(&mut attrs, "migrate_option", job.migrate_option.map(migrate_option_value));
    set_present(&mut attrs, "src_info", job.src_info.map(endpoint_value));
    set_present(&mut attrs, "dst_info", job.dst_info.map(endpoint_value));
    set_present(&mut attrs, "auto_retry_time_range_minutes", job.auto_retry_time_range_minutes);
    attrs
}

impl ResourceHandler for DtsMigrateJobHandler {
    fn schema(&self) -> ResourceSchema {
        dts_migrate_job_schema()
    }

    fn create<'a>(
        &'a self,
        ctx: &'a OperationContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<CompositeId>> {
        Box::pin(async move {
            let job_id = resource.reader().required_string("service_id")?;
            self.configure(ctx, &job_id, resource).await?;
            Ok(CompositeId::single(job_id)?)
        })
    }

    fn describe<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
    ) -> BoxFuture<'a, ProviderResult<Option<Attributes>>> {
        Box::pin(async move { Ok(self.find(ctx, id.part(0)).await?.map(job_attributes)) })
    }

    fn update<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
        _changed: &'a [String],
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.configure(ctx, id.part(0), resource).await })
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let job_id = id.part(0);
            ctx.write(|| self.dts.destroy_migrate_job(&ctx.log_id, job_id))
                .await?;
            ctx.wait_until_gone(|| self.exists(ctx, job_id)).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use cirrus_core::lifecycle;
    use cirrus_core::provider::ErrorKind;
    use cirrus_core::resource::{ResourceId, State};
    use serde_json::json;

    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::resources::testing::{client, ctx};

    fn handler(transport: &Arc<FakeTransport>) -> DtsMigrateJobHandler {
        DtsMigrateJobHandler::new(DtsClient::new(client(transport)))
    }

    fn endpoint(instance: &str) -> Value {
        Value::block(HashMap::from([
            ("region".to_string(), Value::from("ap-guangzhou")),
            ("access_type".to_string(), Value::from("cdb")),
            ("database_type".to_string(), Value::from("mysql")),
            (
                "info".to_string(),
                Value::List(vec![Value::Map(HashMap::from([
                    ("instance_id".to_string(), Value::from(instance)),
                    ("user".to_string(), Value::from("migrator")),
                ]))]),
            ),
        ]))
    }

    fn desired() -> Resource {
        Resource::new("dts_migrate_job", "orders")
            .with_attribute("service_id", Value::from("dts-r0ni3qyp"))
            .with_attribute("run_mode", Value::from("immediate"))
            .with_attribute(
                "migrate_option",
                Value::block(HashMap::from([
                    (
                        "database_table".to_string(),
                        Value::block(HashMap::from([(
                            "object_mode".to_string(),
                            Value::from("all"),
                        )])),
                    ),
                    ("migrate_type".to_string(), Value::from("fullAndIncrement")),
                ])),
            )
            .with_attribute("src_info", endpoint("cdb-src"))
            .with_attribute("dst_info", endpoint("cdb-dst"))
    }

    fn detail(status: &str) -> serde_json::Value {
        json!({
            "JobId": "dts-r0ni3qyp",
            "Status": status,
            "RunMode": "immediate",
            "MigrateOption": {
                "DatabaseTable": {"ObjectMode": "all"},
                "MigrateType": "fullAndIncrement"
            },
            "SrcInfo": {"Region": "ap-guangzhou", "AccessType": "cdb", "DatabaseType": "mysql"}
        })
    }

    #[tokio::test]
    async fn create_polls_job_then_check_verdict() {
        let transport = FakeTransport::new();
        transport.push("ModifyMigrationJob", Ok(json!({})));
        transport.push("DescribeMigrationDetail", Ok(detail("creating")));
        transport.push("DescribeMigrationDetail", Ok(detail(JOB_CREATED)));
        transport.push("CreateMigrateCheckJob", Ok(json!({})));
        transport.push("DescribeMigrationCheckJob", Ok(json!({"Status": "running"})));
        transport.push(
            "DescribeMigrationCheckJob",
            Ok(json!({"Status": CHECK_FINISHED, "CheckFlag": CHECK_PASS})),
        );
        transport.respond("DescribeMigrationDetail", |_| Ok(detail(CHECK_PASS)));

        let state = lifecycle::create(&handler(&transport), &ctx(), &desired()).await.unwrap();

        assert_eq!(state.identifier_or_empty(), "dts-r0ni3qyp");
        assert_eq!(state.attributes.get("status"), Some(&Value::from(CHECK_PASS)));
        assert_eq!(transport.count("DescribeMigrationCheckJob"), 2);

        let body = transport.last_body("ModifyMigrationJob").unwrap();
        assert_eq!(body["JobId"], "dts-r0ni3qyp");
        assert_eq!(body["MigrateOption"]["DatabaseTable"]["ObjectMode"], "all");
        assert_eq!(body["SrcInfo"]["Info"][0]["InstanceId"], "cdb-src");
    }

    #[tokio::test]
    async fn failed_job_status_stops_polling() {
        let transport = FakeTransport::new();
        transport.push("ModifyMigrationJob", Ok(json!({})));
        transport.push("DescribeMigrationDetail", Ok(detail(JOB_FAILED)));

        let err = lifecycle::create(&handler(&transport), &ctx(), &desired()).await.unwrap_err();

        assert!(err.message.contains("failed"));
        assert_eq!(transport.count("DescribeMigrationDetail"), 1);
        assert_eq!(transport.count("CreateMigrateCheckJob"), 0);
    }

    #[tokio::test]
    async fn failing_check_is_an_error() {
        let transport = FakeTransport::new();
        transport.push("ModifyMigrationJob", Ok(json!({})));
        transport.push("DescribeMigrationDetail", Ok(detail(JOB_CREATED)));
        transport.push("CreateMigrateCheckJob", Ok(json!({})));
        transport.push(
            "DescribeMigrationCheckJob",
            Ok(json!({
                "Status": CHECK_FINISHED,
                "CheckFlag": CHECK_NOT_PASS,
                "BriefMsg": "no privilege"
            })),
        );

        let err = lifecycle::create(&handler(&transport), &ctx(), &desired()).await.unwrap_err();
        assert!(err.message.contains(CHECK_NOT_PASS));
    }

    #[tokio::test]
    async fn job_that_never_settles_times_out() {
        let transport = FakeTransport::new();
        transport.push("ModifyMigrationJob", Ok(json!({})));
        transport.respond("DescribeMigrationDetail", |_| Ok(detail("creating")));

        let err = lifecycle::create(&handler(&transport), &ctx(), &desired()).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(transport.count("DescribeMigrationDetail") > 1);
    }

    #[tokio::test]
    async fn delete_waits_until_job_is_gone() {
        let transport = FakeTransport::new();
        let describes = Arc::new(AtomicU32::new(0));
        let counter = describes.clone();
        transport.push("DestroyMigrateJob", Ok(json!({})));
        transport.respond("DescribeMigrationDetail", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(detail("deleting"))
            } else {
                Err(ApiError::new("ResourceNotFound.JobNotFound", "job gone"))
            }
        });
        let state = State::existing(
            ResourceId::new("dts_migrate_job", "orders"),
            desired().attributes,
        )
        .with_identifier("dts-r0ni3qyp");

        lifecycle::delete(&handler(&transport), &ctx(), &state).await.unwrap();

        assert_eq!(transport.count("DestroyMigrateJob"), 1);
        assert_eq!(describes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn read_keeps_fields_the_api_omits() {
        let transport = FakeTransport::new();
        transport.push("DescribeMigrationDetail", Ok(detail("running")));
        let state = State::existing(
            ResourceId::new("dts_migrate_job", "orders"),
            desired().attributes,
        )
        .with_identifier("dts-r0ni3qyp");

        let state = lifecycle::read(&handler(&transport), &ctx(), &state).await.unwrap();

        assert_eq!(state.attributes.get("status"), Some(&Value::from("running")));
        assert_eq!(state.attributes.get("dst_info"), Some(&endpoint("cdb-dst")));
    }

    #[tokio::test]
    async fn transient_error_late_in_poll_stays_within_read_timeout() {
        let transport = FakeTransport::new();
        let ctx = ctx();
        let started = std::time::Instant::now();
        transport.push("ModifyMigrationJob", Ok(json!({})));
        transport.respond("DescribeMigrationDetail", move |_| {
            if started.elapsed() < Duration::from_millis(250) {
                Ok(detail("creating"))
            } else {
                Err(ApiError::new("InternalError", "backend busy"))
            }
        });

        let err = lifecycle::create(&handler(&transport), &ctx, &desired()).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        let budget = ctx.retry.read_timeout + Duration::from_millis(100);
        assert!(started.elapsed() < budget, "took {:?}", started.elapsed());
        assert!(err.message.contains("InternalError"));
    }

    #[tokio::test]
    async fn check_start_retries_status_conflict() {
        let transport = FakeTransport::new();
        transport.push("ModifyMigrationJob", Ok(json!({})));
        transport.push("DescribeMigrationDetail", Ok(detail(JOB_CREATED)));
        transport.push(
            "CreateMigrateCheckJob",
            Err(ApiError::new(STATUS_IN_CONFLICT, "job is being saved")),
        );
        transport.push("CreateMigrateCheckJob", Ok(json!({})));
        transport.push(
            "DescribeMigrationCheckJob",
            Ok(json!({"Status": CHECK_FINISHED, "CheckFlag": CHECK_PASS})),
        );
        transport.respond("DescribeMigrationDetail", |_| Ok(detail(CHECK_PASS)));

        lifecycle::create(&handler(&transport), &ctx(), &desired()).await.unwrap();

        assert_eq!(transport.count("CreateMigrateCheckJob"), 2);
    }

    #[tokio::test]
    async fn changing_job_id_requires_replacement() {
        let transport = FakeTransport::new();
        let state = State::existing(
            ResourceId::new("dts_migrate_job", "orders"),
            desired().attributes,
        )
        .with_identifier("dts-r0ni3qyp");
        let to = desired().with_attribute("service_id", Value::from("dts-other999"));

        let err = lifecycle::update(&handler(&transport), &ctx(), &state, &to).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::RequiresReplacement);
        assert!(err.message.contains("`service_id`"));
        assert_eq!(transport.total_calls(), 0);
    }
}
