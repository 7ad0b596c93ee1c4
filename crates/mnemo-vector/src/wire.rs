// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response bodies returned by the backend REST API.

use mnemo_core::types::Payload;
use serde::Deserialize;
use serde_json::Value;

/// Every response wraps its data in `result`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub result: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireScoredPoint {
    pub id: Value,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRecord {
    pub id: Value,
    #[serde(default)]
    pub payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScrollPage {
    pub points: Vec<WireRecord>,
    #[serde(default)]
    pub next_page_offset: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountResult {
    pub count: u64,
}

/// Error body: `{"status": {"error": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub status: ErrorStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorStatus {
    pub error: String,
}

/// Point IDs are UUID strings or unsigned integers.
pub(crate) fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
