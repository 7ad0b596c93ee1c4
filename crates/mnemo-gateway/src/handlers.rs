// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Convenience endpoints route through the dispatcher so validation and
//! activity logging match the tool-call envelope exactly.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mnemo_core::{ErrorKind, MnemoError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol;
use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// HTTP status for an error class.
pub fn status_for(err: &MnemoError) -> StatusCode {
    match err.kind() {
        ErrorKind::InvalidArgument | ErrorKind::UnsupportedOperation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::BackendUnavailable | ErrorKind::PartialFailure | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: &MnemoError) -> Response {
    (
        status_for(err),
        Json(ErrorResponse {
            error: protocol::error_message(err),
        }),
    )
        .into_response()
}

async fn run(state: &GatewayState, tool: &str, arguments: Value) -> Response {
    match state.dispatcher.dispatch(tool, arguments).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /v1/tools/call
///
/// Always 200; success or failure is carried by the envelope's `status`.
pub async fn post_tool_call(
    State(state): State<GatewayState>,
    Json(body): Json<Value>,
) -> Json<protocol::ToolCallResponse> {
    Json(state.dispatcher.handle_value(body).await)
}

/// POST /v1/messages
pub async fn post_messages(State(state): State<GatewayState>, Json(body): Json<Value>) -> Response {
    run(&state, "add_message", body).await
}

/// GET /v1/conversation-tag
pub async fn get_conversation_tag(State(state): State<GatewayState>) -> Response {
    run(&state, "get_conversation_tag", json!({})).await
}

/// POST /v1/conversation-tag
pub async fn post_conversation_tag(
    State(state): State<GatewayState>,
    Json(body): Json<Value>,
) -> Response {
    run(&state, "set_conversation_tag", body).await
}

/// GET /v1/tagging-mode
pub async fn get_tagging_mode(State(state): State<GatewayState>) -> Response {
    run(&state, "get_tagging_mode", json!({})).await
}

/// POST /v1/tagging-mode
pub async fn post_tagging_mode(
    State(state): State<GatewayState>,
    Json(body): Json<Value>,
) -> Response {
    run(&state, "set_tagging_mode", body).await
}

/// GET /v1/stats
pub async fn get_stats(State(state): State<GatewayState>) -> Response {
    run(&state, "get_memory_stats", json!({})).await
}

/// GET /v1/activity?limit=N
pub async fn get_activity(
    State(state): State<GatewayState>,
    Query(query): Query<ActivityQuery>,
) -> Response {
    run(&state, "get_activity_log", json!({"limit": query.limit})).await
}

/// GET /health (unauthenticated)
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics (unauthenticated)
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics not enabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes_map_to_status_codes() {
        assert_eq!(
            status_for(&MnemoError::InvalidArgument("missing field `role`".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&MnemoError::UnsupportedOperation("fly".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&MnemoError::NotFound("message 1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&MnemoError::BackendUnavailable {
                message: "down".into(),
                source: None
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&MnemoError::Cancelled),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_secs\":42"));
    }
}
