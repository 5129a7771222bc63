//! Lifecycle - The control flow shared by every resource type
//!
//! Per-type code only maps fields to and from remote calls through
//! [`ResourceHandler`] and [`DataSourceHandler`]. Create, Read, Update, Delete
//! and data source evaluation are driven from here.

use std::future::Future;
use std::path::Path;
use std::time::Instant;

use uuid::Uuid;

use crate::api::{ApiError, ErrorClassifier};
use crate::config::RetryConfig;
use crate::differ::{Diff, check_immutable, diff};
use crate::identifier::{CompositeId, ids_hash};
use crate::provider::{BoxFuture, ErrorKind, ProviderError, ProviderResult};
use crate::resource::{Attributes, Resource, State, Value};
use crate::retry::{self, Attempt, Backoff, StatusWait};
use crate::schema::ResourceSchema;
use crate::sync::{OUTPUT_FILE_ATTR, SyncOutcome, reconcile, write_output_file};

/// Per-operation context handed to every handler call
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Prefix for every log line of this operation
    pub log_id: String,
    pub retry: RetryConfig,
    pub classifier: ErrorClassifier,
}

impl OperationContext {
    pub fn new(retry: RetryConfig, classifier: ErrorClassifier) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            retry,
            classifier,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::from(&self.retry)
    }

    /// Apply loop for a mutating call, bounded by the write timeout
    pub async fn write<T, F, Fut>(&self, op: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.classified(self.retry.write_timeout, &[], op).await
    }

    /// Same as [`write`](Self::write), retrying `extra_retryable` codes as well
    pub async fn write_retrying<T, F, Fut>(
        &self,
        extra_retryable: &[&str],
        op: F,
    ) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.classified(self.retry.write_timeout, extra_retryable, op)
            .await
    }

    /// Retry loop for a describe call, bounded by the read timeout
    pub async fn read<T, F, Fut>(&self, op: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.classified(self.retry.read_timeout, &[], op).await
    }

    /// Poll a status until it is terminal, bounded by the read timeout.
    ///
    /// `refresh` makes one describe call per tick; its errors are classified
    /// here, so transient failures spend the same budget as pending statuses.
    pub async fn wait_for_status<F, Fut>(
        &self,
        wait: &StatusWait,
        mut refresh: F,
    ) -> ProviderResult<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<String>, ApiError>>,
    {
        retry::wait_for_status(self.backoff(), self.retry.read_timeout, wait, || {
            let fut = refresh();
            async move { self.attempt(fut.await, &[]) }
        })
        .await
    }

    /// Poll until the object is gone, bounded by the read timeout
    pub async fn wait_until_gone<F, Fut>(&self, mut exists: F) -> ProviderResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, ApiError>>,
    {
        retry::wait_until_gone(self.backoff(), self.retry.read_timeout, || {
            let fut = exists();
            async move { self.attempt(fut.await, &[]) }
        })
        .await
    }

    fn attempt<T>(&self, result: Result<T, ApiError>, extra_retryable: &[&str]) -> Attempt<T> {
        match result {
            Ok(value) => Attempt::Done(value),
            Err(err) => self.classifier.classify_with(err, extra_retryable),
        }
    }

    async fn classified<T, F, Fut>(
        &self,
        timeout: std::time::Duration,
        extra_retryable: &[&str],
        mut op: F,
    ) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        retry::retry(self.backoff(), timeout, || {
            let fut = op();
            async move { self.attempt(fut.await, extra_retryable) }
        })
        .await
    }
}

/// Logs how long an operation took when dropped
pub struct ElapsedLog {
    label: String,
    started: Instant,
}

impl ElapsedLog {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }
}

impl Drop for ElapsedLog {
    fn drop(&mut self) {
        log::debug!(
            "[DEBUG] {} elapsed: {} ms",
            self.label,
            self.started.elapsed().as_millis()
        );
    }
}

/// Field mapping for one managed resource type
pub trait ResourceHandler: Send + Sync {
    fn schema(&self) -> ResourceSchema;

    /// Number of components in this type's stored identifier
    fn id_arity(&self) -> usize {
        1
    }

    /// Create the remote object and return the identifier to store
    fn create<'a>(
        &'a self,
        ctx: &'a OperationContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<CompositeId>>;

    /// Fetch remote fields, `None` when the object does not exist
    fn describe<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
    ) -> BoxFuture<'a, ProviderResult<Option<Attributes>>>;

    /// Apply `changed` fields of `resource` in place
    fn update<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
        changed: &'a [String],
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    fn delete<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}

/// Result of evaluating a data source query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Ids of the returned objects, hashed into the data source identifier
    pub ids: Vec<String>,
    /// Computed attributes to merge into state
    pub attributes: Attributes,
    /// Document written to `result_output_file` when configured
    pub snapshot: serde_json::Value,
}

/// Query mapping for one data source type
pub trait DataSourceHandler: Send + Sync {
    fn schema(&self) -> ResourceSchema;

    fn query<'a>(
        &'a self,
        ctx: &'a OperationContext,
        query: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<QueryResult>>;
}

fn validate(schema: &ResourceSchema, resource: &Resource) -> ProviderResult<()> {
    schema.validate(&resource.attributes).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        ProviderError::validation(messages.join("; ")).for_resource(resource.id.clone())
    })
}

fn decode(handler: &dyn ResourceHandler, state: &State) -> ProviderResult<CompositeId> {
    CompositeId::decode(state.identifier_or_empty(), handler.id_arity())
        .map_err(|e| ProviderError::from(e).for_resource(state.id.clone()))
}

fn output_path(attributes: &Attributes) -> Option<&str> {
    attributes
        .get(OUTPUT_FILE_ATTR)
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
}

/// Create: validate, apply loop, store identifier, then Read
pub async fn create(
    handler: &dyn ResourceHandler,
    ctx: &OperationContext,
    resource: &Resource,
) -> ProviderResult<State> {
    let _elapsed = ElapsedLog::start(format!("resource.{}.create", resource.id.resource_type));
    if resource.is_data_source() {
        return Err(
            ProviderError::not_supported(format!("{} is a data source", resource.id))
                .for_resource(resource.id.clone()),
        );
    }
    validate(&handler.schema(), resource)?;

    let id = handler
        .create(ctx, resource)
        .await
        .map_err(|e| e.for_resource(resource.id.clone()))?;
    if id.arity() != handler.id_arity() {
        return Err(ProviderError::new(
            ErrorKind::BrokenId,
            format!("created id {} has {} parts, expected {}", id, id.arity(), handler.id_arity()),
        )
        .for_resource(resource.id.clone()));
    }
    log::info!("{} created {} with id {}", ctx.log_id, resource.id, id);

    let state = State::existing(resource.id.clone(), resource.attributes.clone())
        .with_identifier(id.encode());
    let state = read(handler, ctx, &state).await?;
    if !state.exists {
        return Err(ProviderError::new(
            ErrorKind::Api,
            format!("created object {} not found on read", id),
        )
        .for_resource(resource.id.clone()));
    }
    Ok(state)
}

/// Read: decode the identifier, describe, reconcile.
///
/// An empty identifier or a not-found describe yields a state with the
/// identifier cleared; that is not an error.
pub async fn read(
    handler: &dyn ResourceHandler,
    ctx: &OperationContext,
    state: &State,
) -> ProviderResult<State> {
    let _elapsed = ElapsedLog::start(format!("resource.{}.read", state.id.resource_type));
    let mut state = state.clone();

    if state.identifier_or_empty().is_empty() {
        reconcile(&mut state, None);
        return Ok(state);
    }

    let id = decode(handler, &state)?;
    let remote = handler
        .describe(ctx, &id)
        .await
        .map_err(|e| e.for_resource(state.id.clone()))?;

    if let SyncOutcome::Refreshed { .. } = reconcile(&mut state, remote)
        && let Some(path) = output_path(&state.attributes)
    {
        let snapshot = serde_json::Value::Object(
            state
                .attributes
                .iter()
                .filter(|(k, _)| k.as_str() != OUTPUT_FILE_ATTR)
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        );
        write_output_file(Path::new(path), &snapshot)
            .map_err(|e| e.for_resource(state.id.clone()))?;
    }
    Ok(state)
}

/// Update: immutable and force-new gates before any remote call, apply
/// changed fields, then Read
pub async fn update(
    handler: &dyn ResourceHandler,
    ctx: &OperationContext,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let _elapsed = ElapsedLog::start(format!("resource.{}.update", to.id.resource_type));
    let schema = handler.schema();
    validate(&schema, to)?;

    let id = decode(handler, from)?;
    let changed = match diff(&schema, to, from) {
        Diff::NoChange(_) => {
            log::debug!("{} {} has no changes, skipping update call", ctx.log_id, to.id);
            Vec::new()
        }
        Diff::Update {
            changed_attributes, ..
        } => {
            check_immutable(&schema, &changed_attributes)
                .map_err(|e| e.for_resource(to.id.clone()))?;
            handler
                .update(ctx, &id, &changed_attributes, to)
                .await
                .map_err(|e| e.for_resource(to.id.clone()))?;
            log::info!("{} updated {}: {}", ctx.log_id, to.id, changed_attributes.join(", "));
            changed_attributes
        }
        Diff::Replace {
            changed_attributes,
            forcing_attributes,
            ..
        } => {
            check_immutable(&schema, &changed_attributes)
                .map_err(|e| e.for_resource(to.id.clone()))?;
            return Err(
                ProviderError::requires_replacement(&forcing_attributes)
                    .for_resource(to.id.clone()),
            );
        }
        Diff::Create(_) => {
            return Err(ProviderError::new(
                ErrorKind::NotSupported,
                format!("{} does not exist and cannot be updated", id),
            )
            .for_resource(to.id.clone()));
        }
    };

    let mut next = from.clone();
    for key in &changed {
        match to.attributes.get(key) {
            Some(value) => next.attributes.insert(key.clone(), value.clone()),
            None => next.attributes.remove(key),
        };
    }
    read(handler, ctx, &next).await
}

/// Delete: decode the identifier, then the handler's delete loop
pub async fn delete(
    handler: &dyn ResourceHandler,
    ctx: &OperationContext,
    state: &State,
) -> ProviderResult<()> {
    let _elapsed = ElapsedLog::start(format!("resource.{}.delete", state.id.resource_type));
    let id = decode(handler, state)?;
    handler
        .delete(ctx, &id)
        .await
        .map_err(|e| e.for_resource(state.id.clone()))?;
    log::info!("{} deleted {} ({})", ctx.log_id, state.id, id);
    Ok(())
}

/// Evaluate a data source: query, hash the result ids, optional snapshot file
pub async fn read_data_source(
    handler: &dyn DataSourceHandler,
    ctx: &OperationContext,
    query: &Resource,
) -> ProviderResult<State> {
    let _elapsed = ElapsedLog::start(format!("data_source.{}.read", query.id.resource_type));
    if !query.is_data_source() {
        return Err(
            ProviderError::not_supported(format!("{} is not a data source", query.id))
                .for_resource(query.id.clone()),
        );
    }
    validate(&handler.schema(), query)?;

    let result = handler
        .query(ctx, query)
        .await
        .map_err(|e| e.for_resource(query.id.clone()))?;

    let mut state = State::existing(query.id.clone(), query.attributes.clone())
        .with_identifier(ids_hash(&result.ids));
    reconcile(&mut state, Some(result.attributes));

    if let Some(path) = output_path(&query.attributes) {
        write_output_file(Path::new(path), &result.snapshot)
            .map_err(|e| e.for_resource(query.id.clone()))?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;
    use crate::schema::{AttributeSchema, AttributeType};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// In-memory projects keyed by (project_id, task_id)
    #[derive(Default)]
    struct FakeTasks {
        tasks: Mutex<HashMap<String, Attributes>>,
        calls: AtomicU32,
    }

    impl FakeTasks {
        fn key(id: &CompositeId) -> String {
            id.encode()
        }
    }

    impl ResourceHandler for FakeTasks {
        fn schema(&self) -> ResourceSchema {
            ResourceSchema::new("test_task")
                .attribute(
                    AttributeSchema::new("project_id", AttributeType::String)
                        .required()
                        .immutable(),
                )
                .attribute(AttributeSchema::new("task_name", AttributeType::String).required())
                .attribute(AttributeSchema::new("region", AttributeType::String).force_new())
                .attribute(AttributeSchema::new("status", AttributeType::String).computed())
                .attribute(AttributeSchema::new(OUTPUT_FILE_ATTR, AttributeType::String))
        }

        fn id_arity(&self) -> usize {
            2
        }

        fn create<'a>(
            &'a self,
            _ctx: &'a OperationContext,
            resource: &'a Resource,
        ) -> BoxFuture<'a, ProviderResult<CompositeId>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let project = resource.reader().required_string("project_id")?;
                let id = CompositeId::new([project, "abc123".to_string()])?;
                let mut attrs = resource.attributes.clone();
                attrs.insert("status".to_string(), Value::from("running"));
                self.tasks.lock().unwrap().insert(Self::key(&id), attrs);
                Ok(id)
            })
        }

        fn describe<'a>(
            &'a self,
            _ctx: &'a OperationContext,
            id: &'a CompositeId,
        ) -> BoxFuture<'a, ProviderResult<Option<Attributes>>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.tasks.lock().unwrap().get(&Self::key(id)).map(|attrs| {
                    attrs
                        .iter()
                        .filter(|(k, _)| k.as_str() != OUTPUT_FILE_ATTR)
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                }))
            })
        }

        fn update<'a>(
            &'a self,
            _ctx: &'a OperationContext,
            id: &'a CompositeId,
            changed: &'a [String],
            resource: &'a Resource,
        ) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let mut tasks = self.tasks.lock().unwrap();
                if let Some(attrs) = tasks.get_mut(&Self::key(id)) {
                    for key in changed {
                        if let Some(value) = resource.attributes.get(key) {
                            attrs.insert(key.clone(), value.clone());
                        }
                    }
                }
                Ok(())
            })
        }

        fn delete<'a>(
            &'a self,
            _ctx: &'a OperationContext,
            id: &'a CompositeId,
        ) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.tasks.lock().unwrap().remove(&Self::key(id));
                Ok(())
            })
        }
    }

    fn ctx() -> OperationContext {
        let _ = env_logger::builder().is_test(true).try_init();
        OperationContext::new(
            RetryConfig {
                read_timeout: Duration::from_millis(200),
                write_timeout: Duration::from_millis(200),
                min_interval: Duration::from_millis(10),
                max_interval: Duration::from_millis(20),
            },
            ErrorClassifier::default(),
        )
    }

    fn desired(name: &str) -> Resource {
        Resource::new("test_task", "task")
            .with_attribute("project_id", Value::from("proj-1"))
            .with_attribute("task_name", Value::from(name))
    }

    #[tokio::test]
    async fn create_stores_composite_id_and_reads_back() {
        let handler = FakeTasks::default();
        let state = create(&handler, &ctx(), &desired("nightly")).await.unwrap();

        assert_eq!(state.identifier_or_empty(), "proj-1#abc123");
        assert_eq!(state.attributes.get("status"), Some(&Value::from("running")));
    }

    #[tokio::test]
    async fn remote_delete_then_read_clears_id() {
        let handler = FakeTasks::default();
        let ctx = ctx();
        let state = create(&handler, &ctx, &desired("nightly")).await.unwrap();
        handler.tasks.lock().unwrap().clear();

        let state = read(&handler, &ctx, &state).await.unwrap();
        assert_eq!(state.identifier_or_empty(), "");
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn read_twice_is_stable() {
        let handler = FakeTasks::default();
        let ctx = ctx();
        let state = create(&handler, &ctx, &desired("nightly")).await.unwrap();

        let first = read(&handler, &ctx, &state).await.unwrap();
        let second = read(&handler, &ctx, &first).await.unwrap();
        assert_eq!(first.attributes, second.attributes);
    }

    #[tokio::test]
    async fn broken_id_fails_without_remote_call() {
        let handler = FakeTasks::default();
        let state = State::existing(ResourceId::new("test_task", "task"), HashMap::new())
            .with_identifier("proj-1");

        let err = read(&handler, &ctx(), &state).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BrokenId);
        assert!(err.message.contains("id is broken"));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn immutable_change_issues_no_remote_call() {
        let handler = FakeTasks::default();
        let ctx = ctx();
        let state = create(&handler, &ctx, &desired("nightly")).await.unwrap();
        let calls = handler.calls.load(Ordering::SeqCst);

        let to = desired("nightly").with_attribute("project_id", Value::from("proj-2"));
        let err = update(&handler, &ctx, &state, &to).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::ImmutableField);
        assert!(err.message.contains("project_id"));
        assert_eq!(handler.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn force_new_change_requires_replacement() {
        let handler = FakeTasks::default();
        let ctx = ctx();
        let created = desired("nightly").with_attribute("region", Value::from("ap-guangzhou"));
        let state = create(&handler, &ctx, &created).await.unwrap();
        let calls = handler.calls.load(Ordering::SeqCst);

        let to = desired("weekly").with_attribute("region", Value::from("ap-shanghai"));
        let err = update(&handler, &ctx, &state, &to).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::RequiresReplacement);
        assert!(err.message.contains("`region`"));
        assert_eq!(err.resource_id, Some(to.id.clone()));
        assert_eq!(handler.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn immutable_gate_wins_over_replacement() {
        let handler = FakeTasks::default();
        let ctx = ctx();
        let created = desired("nightly").with_attribute("region", Value::from("ap-guangzhou"));
        let state = create(&handler, &ctx, &created).await.unwrap();

        let to = created
            .clone()
            .with_attribute("project_id", Value::from("proj-2"))
            .with_attribute("region", Value::from("ap-shanghai"));
        let err = update(&handler, &ctx, &state, &to).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::ImmutableField);
    }

    #[tokio::test]
    async fn data_source_cannot_be_created() {
        let handler = FakeTasks::default();
        let resource = desired("nightly").with_read_only(true);

        let err = create(&handler, &ctx(), &resource).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotSupported);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_applies_changed_fields() {
        let handler = FakeTasks::default();
        let ctx = ctx();
        let state = create(&handler, &ctx, &desired("nightly")).await.unwrap();

        let state = update(&handler, &ctx, &state, &desired("weekly")).await.unwrap();
        assert_eq!(state.attributes.get("task_name"), Some(&Value::from("weekly")));
    }

    #[tokio::test]
    async fn unchanged_update_skips_update_call() {
        let handler = FakeTasks::default();
        let ctx = ctx();
        let state = create(&handler, &ctx, &desired("nightly")).await.unwrap();
        let calls = handler.calls.load(Ordering::SeqCst);

        update(&handler, &ctx, &state, &desired("nightly")).await.unwrap();
        // Only the trailing describe.
        assert_eq!(handler.calls.load(Ordering::SeqCst), calls + 1);
    }

    #[tokio::test]
    async fn missing_required_field_is_rejected_before_create() {
        let handler = FakeTasks::default();
        let resource =
            Resource::new("test_task", "task").with_attribute("task_name", Value::from("x"));

        let err = create(&handler, &ctx(), &resource).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delete_removes_remote_object() {
        let handler = FakeTasks::default();
        let ctx = ctx();
        let state = create(&handler, &ctx, &desired("nightly")).await.unwrap();

        delete(&handler, &ctx, &state).await.unwrap();
        assert!(handler.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_writes_output_file_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.json");
        let handler = FakeTasks::default();
        let resource = desired("nightly").with_attribute(
            OUTPUT_FILE_ATTR,
            Value::from(path.to_string_lossy().to_string()),
        );

        create(&handler, &ctx(), &resource).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["task_name"], "nightly");
        assert!(written.get(OUTPUT_FILE_ATTR).is_none());
    }

    #[tokio::test]
    async fn poll_ticks_classify_errors_within_one_budget() {
        let ctx = ctx();
        let started = std::time::Instant::now();
        let wait = StatusWait::until(["created"]);

        let err = ctx
            .wait_for_status(&wait, || async move {
                if started.elapsed() < Duration::from_millis(150) {
                    Ok(Some("creating".to_string()))
                } else {
                    Err(ApiError::new("InternalError", "backend busy"))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.message.contains("InternalError"));
        assert!(started.elapsed() < ctx.retry.read_timeout + Duration::from_millis(60));
    }

    #[tokio::test]
    async fn poll_stops_on_permanent_error() {
        let ctx = ctx();
        let attempts = AtomicU32::new(0);

        let err = ctx
            .wait_until_gone(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<bool, _>(ApiError::new("AuthFailure.SignatureExpire", "expired")) }
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(err.api_code(), Some("AuthFailure.SignatureExpire"));
    }

    #[tokio::test]
    async fn write_stops_after_one_permanent_error() {
        let ctx = ctx();
        let attempts = AtomicU32::new(0);

        let err = ctx
            .write(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ApiError::new("InvalidParameter.Name", "bad name")) }
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(err.api_code(), Some("InvalidParameter.Name"));
    }

    #[tokio::test]
    async fn write_retries_transient_errors_until_timeout() {
        let ctx = ctx();
        let attempts = AtomicU32::new(0);
        let started = std::time::Instant::now();

        let err = ctx
            .write(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ApiError::network("connection reset")) }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(attempts.load(Ordering::SeqCst) > 1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn write_retrying_overrides_permanent_family() {
        let ctx = ctx();
        let attempts = AtomicU32::new(0);

        let value = ctx
            .write_retrying(&["UnsupportedOperation.TaskRunning"], || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ApiError::new("UnsupportedOperation.TaskRunning", "busy"))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    struct FakeClusters;

    impl DataSourceHandler for FakeClusters {
        fn schema(&self) -> ResourceSchema {
            ResourceSchema::data_source("test_clusters")
                .attribute(AttributeSchema::new(OUTPUT_FILE_ATTR, AttributeType::String))
                .attribute(AttributeSchema::new("total", AttributeType::Int).computed())
        }

        fn query<'a>(
            &'a self,
            _ctx: &'a OperationContext,
            _query: &'a Resource,
        ) -> BoxFuture<'a, ProviderResult<QueryResult>> {
            Box::pin(async move {
                Ok(QueryResult {
                    ids: vec!["cluster-1".to_string(), "cluster-2".to_string()],
                    attributes: [("total".to_string(), Value::from(2i64))].into_iter().collect(),
                    snapshot: serde_json::json!([
                        {"ClusterId": "cluster-1"},
                        {"ClusterId": "cluster-2"}
                    ]),
                })
            })
        }
    }

    #[tokio::test]
    async fn data_source_id_is_hash_of_result_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.json");
        let query = Resource::new("test_clusters", "all")
            .with_read_only(true)
            .with_attribute(OUTPUT_FILE_ATTR, Value::from(path.to_string_lossy().to_string()));

        let state = read_data_source(&FakeClusters, &ctx(), &query).await.unwrap();

        assert_eq!(state.identifier_or_empty(), ids_hash(&["cluster-1", "cluster-2"]));
        assert_eq!(state.attributes.get("total"), Some(&Value::from(2i64)));
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[1]["ClusterId"], "cluster-2");
    }

    #[tokio::test]
    async fn data_source_query_requires_read_only() {
        let query = Resource::new("test_clusters", "all");

        let err = read_data_source(&FakeClusters, &ctx(), &query).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotSupported);
    }
}
