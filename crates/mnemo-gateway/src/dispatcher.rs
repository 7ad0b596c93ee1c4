// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes tool calls to registered tools and records every call.

use std::sync::Arc;
use std::time::Instant;

use mnemo_core::MnemoError;
use mnemo_memory::ActivityLog;
use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::{self, ToolCallRequest, ToolCallResponse};
use crate::tool::ToolRegistry;

/// Stateless apart from the shared registry and activity log, so one
/// dispatcher serves any number of concurrent requests.
pub struct Dispatcher {
    registry: ToolRegistry,
    activity: Arc<ActivityLog>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, activity: Arc<ActivityLog>) -> Self {
        Self { registry, activity }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke `name` with `arguments`.
    ///
    /// Unknown names fail with `UnsupportedOperation`. Every call, known or
    /// not, lands in the activity log and the call counter.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, MnemoError> {
        let started = Instant::now();
        let result = match self.registry.get(name) {
            Some(tool) => tool.invoke(arguments).await,
            None => Err(MnemoError::UnsupportedOperation(name.to_string())),
        };
        let elapsed = started.elapsed();

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(
            "mnemo_tool_calls_total",
            "tool" => name.to_string(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!("mnemo_tool_call_duration_seconds", "tool" => name.to_string())
            .record(elapsed.as_secs_f64());

        match &result {
            Ok(_) => {
                debug!(tool = name, elapsed_ms = elapsed.as_millis() as u64, "tool call ok");
                self.activity.record(name, None, elapsed).await;
            }
            Err(e) => {
                let message = protocol::error_message(e);
                if e.is_client_error() {
                    debug!(tool = name, error = %message, "tool call rejected");
                } else {
                    warn!(tool = name, error = %message, "tool call failed");
                }
                self.activity.record(name, Some(message), elapsed).await;
            }
        }
        result
    }

    /// Handle a parsed envelope, producing a response correlated by `id`.
    pub async fn handle(&self, request: ToolCallRequest) -> ToolCallResponse {
        match self
            .dispatch(&request.data.name, request.data.arguments)
            .await
        {
            Ok(result) => ToolCallResponse::ok(request.id, result),
            Err(e) => ToolCallResponse::error(request.id, &e),
        }
    }

    /// Handle a raw JSON envelope. Malformed envelopes get an error response
    /// echoing whatever `id` could be recovered.
    pub async fn handle_value(&self, value: Value) -> ToolCallResponse {
        match protocol::parse_request(value) {
            Ok(request) => self.handle(request).await,
            Err((id, e)) => ToolCallResponse::error(id, &e),
        }
    }

    /// Handle one line of the stdio transport.
    pub async fn handle_line(&self, line: &str) -> ToolCallResponse {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => ToolCallResponse::error(
                String::new(),
                &MnemoError::InvalidArgument(format!("malformed JSON: {e}")),
            ),
        }
    }
}
