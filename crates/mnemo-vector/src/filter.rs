// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation of [`Filter`] into the backend's JSON filter language.

use mnemo_core::{Condition, Filter};
use serde_json::{json, Map, Value};

/// Render a filter as `{"must": [...], "must_not": [...]}`, omitting empty clauses.
pub fn to_json(filter: &Filter) -> Value {
    let mut out = Map::new();
    if !filter.must.is_empty() {
        out.insert(
            "must".into(),
            Value::Array(filter.must.iter().map(condition_to_json).collect()),
        );
    }
    if !filter.must_not.is_empty() {
        out.insert(
            "must_not".into(),
            Value::Array(filter.must_not.iter().map(condition_to_json).collect()),
        );
    }
    Value::Object(out)
}

fn condition_to_json(condition: &Condition) -> Value {
    match condition {
        Condition::Match { key, value } => json!({"key": key, "match": {"value": value}}),
        Condition::MatchAny { key, any } => json!({"key": key, "match": {"any": any}}),
        Condition::Range { key, gte, lt, lte } => {
            let mut range = Map::new();
            for (name, bound) in [("gte", gte), ("lt", lt), ("lte", lte)] {
                if let Some(bound) = bound {
                    range.insert(name.into(), json!(bound));
                }
            }
            json!({"key": key, "range": range})
        }
        Condition::HasId(ids) => json!({"has_id": ids}),
    }
}

/// `Some(json)` for a non-empty filter; the backend treats a missing filter as "match all".
pub(crate) fn optional(filter: Option<&Filter>) -> Option<Value> {
    filter.filter(|f| !f.is_empty()).map(to_json)
}
