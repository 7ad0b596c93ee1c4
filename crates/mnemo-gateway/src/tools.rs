// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in tools: one per supported operation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mnemo_core::{IndexReport, Message, MnemoError, Role, TaggingMode};
use mnemo_memory::{HistoryFilter, Period};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::tool::{parse_args, Tool, ToolRegistry};

const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// Declares a tool struct holding the shared context.
macro_rules! context_tool {
    ($ty:ident) => {
        pub struct $ty {
            ctx: ToolContext,
        }

        impl $ty {
            pub fn new(ctx: ToolContext) -> Self {
                Self { ctx }
            }
        }
    };
}

fn parse_role(value: &str) -> Result<Role, MnemoError> {
    value.parse::<Role>().map_err(|_| {
        MnemoError::InvalidArgument(format!(
            "invalid role `{value}`: expected one of user, assistant, system"
        ))
    })
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>, MnemoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| MnemoError::InvalidArgument(format!("invalid {field} `{value}`: {e}")))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, MnemoError> {
    serde_json::to_value(value)
        .map_err(|e| MnemoError::Internal(format!("failed to serialize result: {e}")))
}

/// Index report plus the headline count.
#[derive(Serialize)]
struct IndexResult<'a> {
    path: &'a str,
    indexed: usize,
    #[serde(flatten)]
    report: &'a IndexReport,
}

fn index_result(path: &str, report: &IndexReport) -> Result<Value, MnemoError> {
    to_value(&IndexResult {
        path,
        indexed: report.indexed(),
        report,
    })
}

context_tool!(AddMessageTool);

#[derive(Deserialize)]
struct AddMessageArgs {
    role: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[async_trait]
impl Tool for AddMessageTool {
    fn name(&self) -> &str {
        "add_message"
    }

    fn description(&self) -> &str {
        "Store a conversational message"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "role": {"type": "string", "enum": ["user", "assistant", "system"]},
                "content": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "metadata": {"type": "object", "additionalProperties": {"type": "string"}}
            },
            "required": ["role", "content"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: AddMessageArgs = parse_args(self.name(), arguments)?;
        let role = parse_role(&args.role)?;
        let tags = self.ctx.session.effective_tags(args.tags).await;
        let message = Message::new(role, args.content)
            .with_tags(tags.clone())
            .with_metadata(args.metadata);
        let timestamp = message.timestamp;
        let id = self.ctx.store.add_message(message).await?;
        Ok(json!({"id": id, "tags": tags, "timestamp": timestamp}))
    }
}

context_tool!(SearchTool);

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_similar_messages"
    }

    fn description(&self) -> &str {
        "Find stored messages and files most similar to a query"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "limit": {"type": "integer", "minimum": 1}
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: SearchArgs = parse_args(self.name(), arguments)?;
        let results = self.ctx.store.search_messages(&args.query, args.limit).await?;
        Ok(json!({"results": results}))
    }
}

context_tool!(HistoryTool);

#[derive(Deserialize)]
struct HistoryArgs {
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

#[async_trait]
impl Tool for HistoryTool {
    fn name(&self) -> &str {
        "get_conversation_history"
    }

    fn description(&self) -> &str {
        "Recent messages, newest first, optionally filtered by role, tags, and time"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {"type": "integer", "minimum": 1},
                "role": {"type": "string", "enum": ["user", "assistant", "system"]},
                "tags": {"type": "array", "items": {"type": "string"}},
                "start": {"type": "string", "format": "date-time"},
                "end": {"type": "string", "format": "date-time"}
            }
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: HistoryArgs = parse_args(self.name(), arguments)?;
        let filter = HistoryFilter {
            role: args.role.as_deref().map(parse_role).transpose()?,
            tags: args.tags,
            start: args.start.as_deref().map(|s| parse_time("start", s)).transpose()?,
            end: args.end.as_deref().map(|s| parse_time("end", s)).transpose()?,
        };
        let messages = self
            .ctx
            .store
            .get_conversation_history(args.limit, &filter)
            .await?;
        Ok(json!({"messages": messages}))
    }
}

#[derive(Deserialize)]
struct ProjectArgs {
    path: String,
    #[serde(default)]
    tag: Option<String>,
}

fn project_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {"type": "string"},
            "tag": {"type": "string"}
        },
        "required": ["path"]
    })
}

context_tool!(IndexProjectTool);

#[async_trait]
impl Tool for IndexProjectTool {
    fn name(&self) -> &str {
        "index_project"
    }

    fn description(&self) -> &str {
        "Index every not-yet-indexed file under a directory"
    }

    fn parameters_schema(&self) -> Value {
        project_schema()
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: ProjectArgs = parse_args(self.name(), arguments)?;
        let report = self
            .ctx
            .indexer
            .index_project(&PathBuf::from(&args.path), args.tag.as_deref(), &self.ctx.cancel)
            .await?;
        index_result(&args.path, &report)
    }
}

context_tool!(UpdateProjectTool);

#[async_trait]
impl Tool for UpdateProjectTool {
    fn name(&self) -> &str {
        "update_project"
    }

    fn description(&self) -> &str {
        "Index new files and re-index modified files under a directory"
    }

    fn parameters_schema(&self) -> Value {
        project_schema()
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: ProjectArgs = parse_args(self.name(), arguments)?;
        let report = self
            .ctx
            .indexer
            .update_project(&PathBuf::from(&args.path), args.tag.as_deref(), &self.ctx.cancel)
            .await?;
        index_result(&args.path, &report)
    }
}

context_tool!(SetTagTool);

#[derive(Deserialize)]
struct SetTagArgs {
    tag: String,
}

#[async_trait]
impl Tool for SetTagTool {
    fn name(&self) -> &str {
        "set_conversation_tag"
    }

    fn description(&self) -> &str {
        "Set the active conversation tag; an empty string clears it"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"tag": {"type": "string"}},
            "required": ["tag"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: SetTagArgs = parse_args(self.name(), arguments)?;
        let previous = self.ctx.session.set_tag(args.tag).await;
        let tag = self.ctx.session.tag().await;
        Ok(json!({"tag": tag, "previous": previous}))
    }
}

context_tool!(GetTagTool);

#[async_trait]
impl Tool for GetTagTool {
    fn name(&self) -> &str {
        "get_conversation_tag"
    }

    fn description(&self) -> &str {
        "Current conversation tag"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, MnemoError> {
        Ok(json!({"tag": self.ctx.session.tag().await}))
    }
}

context_tool!(SetModeTool);

#[derive(Deserialize)]
struct SetModeArgs {
    mode: String,
}

#[async_trait]
impl Tool for SetModeTool {
    fn name(&self) -> &str {
        "set_tagging_mode"
    }

    fn description(&self) -> &str {
        "Choose whether the active tag is applied to new messages automatically"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"mode": {"type": "string", "enum": ["automatic", "manual"]}},
            "required": ["mode"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: SetModeArgs = parse_args(self.name(), arguments)?;
        let mode = args.mode.parse::<TaggingMode>().map_err(|_| {
            MnemoError::InvalidArgument(format!(
                "invalid mode `{}`: expected automatic or manual",
                args.mode
            ))
        })?;
        self.ctx.session.set_mode(mode).await;
        Ok(json!({"mode": mode}))
    }
}

context_tool!(GetModeTool);

#[async_trait]
impl Tool for GetModeTool {
    fn name(&self) -> &str {
        "get_tagging_mode"
    }

    fn description(&self) -> &str {
        "Current tagging mode"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, MnemoError> {
        Ok(json!({"mode": self.ctx.session.mode().await}))
    }
}

context_tool!(DeletePeriodTool);

#[derive(Deserialize)]
struct DeletePeriodArgs {
    period: String,
}

#[async_trait]
impl Tool for DeletePeriodTool {
    fn name(&self) -> &str {
        "delete_messages"
    }

    fn description(&self) -> &str {
        "Delete messages from today, this week, or this month"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"period": {"type": "string", "enum": ["today", "week", "month"]}},
            "required": ["period"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: DeletePeriodArgs = parse_args(self.name(), arguments)?;
        let period = args.period.parse::<Period>().map_err(|_| {
            MnemoError::InvalidArgument(format!(
                "invalid period `{}`: expected today, week, or month",
                args.period
            ))
        })?;
        let deleted = self.ctx.store.delete_messages_in_period(period).await?;
        Ok(json!({"deleted": deleted, "period": period}))
    }
}

context_tool!(DeleteRangeTool);

#[derive(Deserialize)]
struct DeleteRangeArgs {
    start: String,
    end: String,
}

#[async_trait]
impl Tool for DeleteRangeTool {
    fn name(&self) -> &str {
        "delete_messages_by_time_range"
    }

    fn description(&self) -> &str {
        "Delete messages with start <= timestamp <= end (RFC 3339)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start": {"type": "string", "format": "date-time"},
                "end": {"type": "string", "format": "date-time"}
            },
            "required": ["start", "end"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: DeleteRangeArgs = parse_args(self.name(), arguments)?;
        let start = parse_time("start", &args.start)?;
        let end = parse_time("end", &args.end)?;
        let deleted = self
            .ctx
            .store
            .delete_messages_by_time_range(start, end)
            .await?;
        Ok(json!({"deleted": deleted}))
    }
}

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

fn id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"id": {"type": "string"}},
        "required": ["id"]
    })
}

context_tool!(GetMessageTool);

#[async_trait]
impl Tool for GetMessageTool {
    fn name(&self) -> &str {
        "get_message"
    }

    fn description(&self) -> &str {
        "Fetch one message by ID"
    }

    fn parameters_schema(&self) -> Value {
        id_schema()
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: IdArgs = parse_args(self.name(), arguments)?;
        let message = self.ctx.store.get_message(&args.id).await?;
        to_value(&message)
    }
}

context_tool!(DeleteMessageTool);

#[async_trait]
impl Tool for DeleteMessageTool {
    fn name(&self) -> &str {
        "delete_message"
    }

    fn description(&self) -> &str {
        "Delete one message by ID"
    }

    fn parameters_schema(&self) -> Value {
        id_schema()
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: IdArgs = parse_args(self.name(), arguments)?;
        self.ctx.store.delete_message(&args.id).await?;
        Ok(json!({"deleted": 1, "id": args.id}))
    }
}

context_tool!(ClearMessagesTool);

#[async_trait]
impl Tool for ClearMessagesTool {
    fn name(&self) -> &str {
        "clear_messages"
    }

    fn description(&self) -> &str {
        "Delete every conversational message, keeping indexed project files"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, MnemoError> {
        Ok(json!({"deleted": self.ctx.store.clear_messages().await?}))
    }
}

context_tool!(ClearProjectFilesTool);

#[derive(Deserialize)]
struct ClearProjectArgs {
    #[serde(default)]
    tag: Option<String>,
}

#[async_trait]
impl Tool for ClearProjectFilesTool {
    fn name(&self) -> &str {
        "clear_project_files"
    }

    fn description(&self) -> &str {
        "Delete indexed project files, optionally only those with a tag"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"tag": {"type": "string"}}})
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: ClearProjectArgs = parse_args(self.name(), arguments)?;
        let deleted = match args.tag.as_deref() {
            Some(tag) => self.ctx.store.clear_project_files_by_tag(tag).await?,
            None => self.ctx.store.clear_project_files().await?,
        };
        Ok(json!({"deleted": deleted}))
    }
}

context_tool!(ClearAllTool);

#[async_trait]
impl Tool for ClearAllTool {
    fn name(&self) -> &str {
        "clear_all_memories"
    }

    fn description(&self) -> &str {
        "Delete every message and project file"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, MnemoError> {
        Ok(json!({"deleted": self.ctx.store.clear_all_memories().await?}))
    }
}

context_tool!(StatsTool);

#[async_trait]
impl Tool for StatsTool {
    fn name(&self) -> &str {
        "get_memory_stats"
    }

    fn description(&self) -> &str {
        "Current counts plus the recent sample history"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, MnemoError> {
        let current = self.ctx.stats.sample().await?;
        let history = self.ctx.stats.history().await;
        Ok(json!({
            "current": current,
            "total_messages": current.total_messages(),
            "history": history,
        }))
    }
}

context_tool!(ActivityTool);

#[derive(Deserialize)]
struct ActivityArgs {
    #[serde(default)]
    limit: Option<usize>,
}

#[async_trait]
impl Tool for ActivityTool {
    fn name(&self) -> &str {
        "get_activity_log"
    }

    fn description(&self) -> &str {
        "Recently dispatched operations, newest first"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"limit": {"type": "integer", "minimum": 1}}})
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
        let args: ActivityArgs = parse_args(self.name(), arguments)?;
        let limit = args.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_ACTIVITY_LIMIT);
        Ok(json!({"entries": self.ctx.activity.recent(limit).await}))
    }
}

/// Lists the registry it was built from.
pub struct ListToolsTool {
    definitions: Vec<Value>,
}

#[async_trait]
impl Tool for ListToolsTool {
    fn name(&self) -> &str {
        "list_tools"
    }

    fn description(&self) -> &str {
        "Names, descriptions, and argument schemas of every supported operation"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, MnemoError> {
        Ok(json!({"tools": self.definitions}))
    }
}

/// Registry holding every built-in tool.
pub fn builtin_registry(ctx: &ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(AddMessageTool::new(ctx.clone())),
        Arc::new(SearchTool::new(ctx.clone())),
        Arc::new(HistoryTool::new(ctx.clone())),
        Arc::new(IndexProjectTool::new(ctx.clone())),
        Arc::new(UpdateProjectTool::new(ctx.clone())),
        Arc::new(SetTagTool::new(ctx.clone())),
        Arc::new(GetTagTool::new(ctx.clone())),
        Arc::new(SetModeTool::new(ctx.clone())),
        Arc::new(GetModeTool::new(ctx.clone())),
        Arc::new(DeletePeriodTool::new(ctx.clone())),
        Arc::new(DeleteRangeTool::new(ctx.clone())),
        Arc::new(GetMessageTool::new(ctx.clone())),
        Arc::new(DeleteMessageTool::new(ctx.clone())),
        Arc::new(ClearMessagesTool::new(ctx.clone())),
        Arc::new(ClearProjectFilesTool::new(ctx.clone())),
        Arc::new(ClearAllTool::new(ctx.clone())),
        Arc::new(StatsTool::new(ctx.clone())),
        Arc::new(ActivityTool::new(ctx.clone())),
    ];
    for tool in tools {
        registry.register(tool);
    }

    let mut definitions = registry.tool_definitions();
    let list_tools = ListToolsTool {
        definitions: Vec::new(),
    };
    definitions.push(json!({
        "name": list_tools.name(),
        "description": list_tools.description(),
        "parameters": list_tools.parameters_schema(),
    }));
    definitions.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
    registry.register(Arc::new(ListToolsTool { definitions }));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_for_messages() {
        assert_eq!(parse_role("User").unwrap(), Role::User);
        let err = parse_role("robot").unwrap_err();
        assert!(err.to_string().contains("invalid role `robot`"));
    }

    #[test]
    fn times_must_be_rfc3339() {
        assert!(parse_time("start", "2026-03-01T00:00:00Z").is_ok());
        assert!(parse_time("start", "2026-03-01T00:00:00+02:00").is_ok());
        let err = parse_time("end", "yesterday").unwrap_err();
        assert_eq!(err.kind(), mnemo_core::ErrorKind::InvalidArgument);
    }

    #[test]
    fn index_result_flattens_report() {
        let report = IndexReport {
            added: 2,
            updated: 1,
            excluded: 3,
            ..IndexReport::default()
        };
        let value = index_result("/p", &report).unwrap();
        assert_eq!(value["indexed"], 3);
        assert_eq!(value["added"], 2);
        assert_eq!(value["excluded"], 3);
        assert_eq!(value["path"], "/p");
    }
}
