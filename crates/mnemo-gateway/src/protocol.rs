// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool-call request and response envelopes.
//!
//! Request: `{"id": "...", "type": "tool_call", "data": {"name": "...", "arguments": {...}}}`
//!
//! Response: `{"id": "...", "status": "ok"|"error", "result"?: ..., "error"?: "..."}`

use mnemo_core::MnemoError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only request type currently defined.
pub const TOOL_CALL: &str = "tool_call";

/// Inbound tool-call envelope.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: ToolCallData,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolCallData {
    pub name: String,
    /// Missing or `null` arguments are treated as `{}`.
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Outbound envelope. `id` echoes the request so callers can correlate
/// responses that arrive out of order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolCallResponse {
    pub id: String,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallResponse {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            status: ResponseStatus::Ok,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, err: &MnemoError) -> Self {
        Self {
            id: id.into(),
            status: ResponseStatus::Error,
            result: None,
            error: Some(error_message(err)),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

/// Error text prefixed with its taxonomy class, e.g.
/// `InvalidArgument: missing field `role``.
pub fn error_message(err: &MnemoError) -> String {
    format!("{}: {err}", err.kind())
}

/// Parse an envelope from JSON, keeping the request `id` when the rest is malformed.
pub fn parse_request(value: Value) -> Result<ToolCallRequest, (String, MnemoError)> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let request: ToolCallRequest = serde_json::from_value(value).map_err(|e| {
        (
            id.clone(),
            MnemoError::InvalidArgument(format!("malformed request: {e}")),
        )
    })?;
    if request.kind != TOOL_CALL {
        return Err((
            id,
            MnemoError::InvalidArgument(format!(
                "unsupported request type `{}`, expected `{TOOL_CALL}`",
                request.kind
            )),
        ));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_envelope_without_arguments() {
        let request = parse_request(json!({
            "id": "1",
            "type": "tool_call",
            "data": {"name": "get_conversation_tag"}
        }))
        .unwrap();
        assert_eq!(request.data.name, "get_conversation_tag");
        assert!(request.data.arguments.is_null());
    }

    #[test]
    fn malformed_envelope_keeps_id() {
        let (id, err) = parse_request(json!({"id": "7", "type": "tool_call"})).unwrap_err();
        assert_eq!(id, "7");
        assert!(err.to_string().contains("missing field `data`"), "{err}");
    }

    #[test]
    fn rejects_other_request_types() {
        let (id, err) = parse_request(json!({
            "id": "2",
            "type": "subscribe",
            "data": {"name": "x"}
        }))
        .unwrap_err();
        assert_eq!(id, "2");
        assert_eq!(err.kind(), mnemo_core::ErrorKind::InvalidArgument);
    }

    #[test]
    fn error_response_is_classified() {
        let response =
            ToolCallResponse::error("9", &MnemoError::UnsupportedOperation("fly".into()));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "9",
                "status": "error",
                "error": "UnsupportedOperation: unsupported operation: fly"
            })
        );
    }
}
