// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend-agnostic payload filters.
//!
//! A [`Filter`] is a conjunction of `must` conditions plus a list of
//! `must_not` exclusions. Vector store adapters translate it into their own
//! filter language; [`Filter::matches`] evaluates it locally for client-side
//! refinement and for in-process backends.

use serde_json::Value;

use crate::types::Payload;

/// A single predicate over a point.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals value. Array fields match when any element equals.
    Match { key: String, value: Value },
    /// Field (or any array element) is one of `any`.
    MatchAny { key: String, any: Vec<String> },
    /// Numeric range, bounds optional.
    Range {
        key: String,
        gte: Option<f64>,
        lt: Option<f64>,
        lte: Option<f64>,
    },
    /// Point ID is one of the listed IDs.
    HasId(Vec<String>),
}

impl Condition {
    pub fn eq(key: &str, value: impl Into<Value>) -> Self {
        Condition::Match {
            key: key.to_string(),
            value: value.into(),
        }
    }

    pub fn any_of(key: &str, any: Vec<String>) -> Self {
        Condition::MatchAny {
            key: key.to_string(),
            any,
        }
    }

    /// Closed range `[gte, lte]`.
    pub fn between(key: &str, gte: f64, lte: f64) -> Self {
        Condition::Range {
            key: key.to_string(),
            gte: Some(gte),
            lt: None,
            lte: Some(lte),
        }
    }

    /// Evaluate against a point ID and payload.
    pub fn matches(&self, id: &str, payload: &Payload) -> bool {
        match self {
            Condition::Match { key, value } => match payload.get(key) {
                Some(Value::Array(items)) => items.iter().any(|item| item == value),
                Some(found) => found == value,
                None => false,
            },
            Condition::MatchAny { key, any } => {
                let hit = |v: &Value| v.as_str().is_some_and(|s| any.iter().any(|a| a == s));
                match payload.get(key) {
                    Some(Value::Array(items)) => items.iter().any(hit),
                    Some(found) => hit(found),
                    None => false,
                }
            }
            Condition::Range { key, gte, lt, lte } => {
                let Some(n) = payload.get(key).and_then(Value::as_f64) else {
                    return false;
                };
                gte.is_none_or(|b| n >= b)
                    && lt.is_none_or(|b| n < b)
                    && lte.is_none_or(|b| n <= b)
            }
            Condition::HasId(ids) => ids.iter().any(|i| i == id),
        }
    }
}

/// Conjunction of conditions with exclusions. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub must: Vec<Condition>,
    pub must_not: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, condition: Condition) -> Self {
        self.must.push(condition);
        self
    }

    pub fn must_not(mut self, condition: Condition) -> Self {
        self.must_not.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }

    pub fn matches(&self, id: &str, payload: &Payload) -> bool {
        self.must.iter().all(|c| c.matches(id, payload))
            && !self.must_not.iter().any(|c| c.matches(id, payload))
    }
}
