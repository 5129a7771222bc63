//! tsf_task - TSF distributed task

use cirrus_core::identifier::CompositeId;
use cirrus_core::lifecycle::{OperationContext, ResourceHandler};
use cirrus_core::provider::{BoxFuture, ProviderError, ProviderResult};
use cirrus_core::resource::{AttributeReader, Attributes, Resource, Value, set_present};
use cirrus_core::schema::ResourceSchema;

use super::{ResponseError, entry, unsigned};
use crate::client::not_found_as_none;
use crate::schemas::tsf::tsf_task_schema;
use crate::services::TsfClient;
use crate::services::tsf::{
    AdvanceSettings, CreateTaskRequest, ModifyTaskRequest, ShardArgument, TaskRecord, TaskRule,
};

pub struct TsfTaskHandler {
    tsf: TsfClient,
}

impl TsfTaskHandler {
    pub fn new(tsf: TsfClient) -> Self {
        Self { tsf }
    }
}

fn task_rule(reader: &AttributeReader<'_>) -> ProviderResult<Option<TaskRule>> {
    reader
        .block("task_rule")?
        .map(|rule| {
            Ok(TaskRule {
                rule_type: rule.string("rule_type")?,
                expression: rule.string("expression")?,
                repeat_interval: unsigned(&rule, "repeat_interval")?,
            })
        })
        .transpose()
}

fn shard_arguments(reader: &AttributeReader<'_>) -> ProviderResult<Vec<ShardArgument>> {
    reader
        .blocks("shard_arguments")?
        .iter()
        .map(|arg| {
            Ok(ShardArgument {
                shard_key: unsigned(arg, "shard_key")?,
                shard_value: arg.string("shard_value")?,
            })
        })
        .collect()
}

fn advance_settings(reader: &AttributeReader<'_>) -> ProviderResult<Option<AdvanceSettings>> {
    reader
        .block("advance_settings")?
        .map(|settings| {
            Ok(AdvanceSettings {
                sub_task_concurrency: settings.int("sub_task_concurrency")?,
            })
        })
        .transpose()
}

/// `success_ratio` is configured as a string but modified as a number
fn parse_ratio(raw: &str) -> ProviderResult<i64> {
    raw.trim().parse().map_err(|_| {
        ProviderError::validation(format!("success_ratio must be an integer, got '{}'", raw))
    })
}

fn create_request(reader: &AttributeReader<'_>) -> ProviderResult<CreateTaskRequest> {
    Ok(CreateTaskRequest {
        task_name: reader.required_string("task_name")?,
        task_content: reader.required_string("task_content")?,
        execute_type: reader.required_string("execute_type")?,
        task_type: reader.required_string("task_type")?,
        time_out: unsigned(reader, "time_out")?.unwrap_or_default(),
        group_id: reader.required_string("group_id")?,
        task_rule: task_rule(reader)?,
        retry_count: unsigned(reader, "retry_count")?,
        retry_interval: unsigned(reader, "retry_interval")?,
        shard_count: reader.int("shard_count")?,
        shard_arguments: shard_arguments(reader)?,
        success_operator: reader.string("success_operator")?,
        success_ratio: reader.string("success_ratio")?,
        advance_settings: advance_settings(reader)?,
        task_argument: reader.string("task_argument")?,
        program_id_list: reader.strings("program_id_list")?,
    })
}

/// Only the changed fields are sent
fn modify_request(
    task_id: &str,
    changed: &[String],
    reader: &AttributeReader<'_>,
) -> ProviderResult<ModifyTaskRequest> {
    let mut request = ModifyTaskRequest {
        task_id: task_id.to_string(),
        ..Default::default()
    };
    for key in changed {
        match key.as_str() {
            "task_name" => request.task_name = reader.string(key)?,
            "task_content" => request.task_content = reader.string(key)?,
            "execute_type" => request.execute_type = reader.string(key)?,
            "task_type" => request.task_type = reader.string(key)?,
            "time_out" => request.time_out = unsigned(reader, key)?,
            "group_id" => request.group_id = reader.string(key)?,
            "task_rule" => request.task_rule = task_rule(reader)?,
            "retry_count" => request.retry_count = unsigned(reader, key)?,
            "retry_interval" => request.retry_interval = unsigned(reader, key)?,
            "shard_count" => request.shard_count = reader.int(key)?,
            "shard_arguments" => request.shard_arguments = Some(shard_arguments(reader)?),
            "success_operator" => request.success_operator = reader.string(key)?,
            "success_ratio" => {
                request.success_ratio = reader.string(key)?.as_deref().map(parse_ratio).transpose()?
            }
            "advance_settings" => request.advance_settings = advance_settings(reader)?,
            "task_argument" => request.task_argument = reader.string(key)?,
            "program_id_list" => request.program_id_list = Some(reader.strings(key)?),
            _ => {}
        }
    }
    Ok(request)
}

fn task_attributes(task: TaskRecord) -> Attributes {
    let mut attrs = Attributes::new();
    set_present(&mut attrs, "task_id", task.task_id);
    set_present(&mut attrs, "task_name", task.task_name);
    set_present(&mut attrs, "task_content", task.task_content);
    set_present(&mut attrs, "execute_type", task.execute_type);
    set_present(&mut attrs, "task_type", task.task_type);
    set_present(&mut attrs, "time_out", task.time_out);
    set_present(&mut attrs, "group_id", task.group_id);
    set_present(
        &mut attrs,
        "task_rule",
        task.task_rule.map(|rule| {
            Value::block(entry([
                ("rule_type", rule.rule_type.map(Value::from)),
                ("expression", rule.expression.map(Value::from)),
                ("repeat_interval", rule.repeat_interval.map(Value::from)),
            ]))
        }),
    );
    set_present(&mut attrs, "retry_count", task.retry_count);
    set_present(&mut attrs, "retry_interval", task.retry_interval);
    set_present(&mut attrs, "shard_count", task.shard_count);
    set_present(
        &mut attrs,
        "shard_arguments",
        task.shard_arguments.map(|args| {
            Value::List(
                args.into_iter()
                    .map(|arg| {
                        Value::Map(entry([
                            ("shard_key", arg.shard_key.map(Value::from)),
                            ("shard_value", arg.shard_value.map(Value::from)),
                        ]))
                    })
                    .collect(),
            )
        }),
    );
    set_present(&mut attrs, "success_operator", task.success_operator);
    set_present(&mut attrs, "success_ratio", task.success_ratio.map(|r| r.to_string()));
    set_present(
        &mut attrs,
        "advance_settings",
        task.advance_settings.map(|settings| {
            Value::block(entry([(
                "sub_task_concurrency",
                settings.sub_task_concurrency.map(Value::from),
            )]))
        }),
    );
    set_present(&mut attrs, "task_argument", task.task_argument);
    set_present(&mut attrs, "task_state", task.task_state);
    set_present(&mut attrs, "belong_flow_ids", task.belong_flow_ids);
    set_present(&mut attrs, "task_log_id", task.task_log_id);
    set_present(&mut attrs, "trigger_type", task.trigger_type);
    set_present(&mut attrs, "program_id_list", task.program_id_list);
    attrs
}

impl ResourceHandler for TsfTaskHandler {
    fn schema(&self) -> ResourceSchema {
        tsf_task_schema()
    }

    fn create<'a>(
        &'a self,
        ctx: &'a OperationContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<CompositeId>> {
        Box::pin(async move {
            let request = create_request(&resource.reader())?;
            let response = ctx
                .write(|| self.tsf.create_task(&ctx.log_id, &request))
                .await?;
            let task_id = response.result.ok_or(ResponseError::MissingField {
                action: "CreateTask",
                field: "task id",
            })?;
            Ok(CompositeId::single(task_id)?)
        })
    }

    fn describe<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
    ) -> BoxFuture<'a, ProviderResult<Option<Attributes>>> {
        Box::pin(async move {
            let task_id = id.part(0);
            let response = ctx
                .read(|| async move {
                    not_found_as_none(self.tsf.describe_task_detail(&ctx.log_id, task_id).await)
                })
                .await?;
            Ok(response.and_then(|r| r.result).map(task_attributes))
        })
    }

    fn update<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a CompositeId,
        changed: &'a [String],
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let request = modify_request(id.part(0), changed, &resource.reader())?;
            ctx.write(|| self.tsf.modify_task(&ctx.log_id, &request))
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
            ctx.write(|| self.tsf.delete_task(&ctx.log_id, id.part(0)))
                .await?;
            Ok(())
        })
    }
}
