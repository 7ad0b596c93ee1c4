// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the memory engine.
//!
//! Messages and project files are both stored as vector points in a single
//! collection; the payload layout for each lives here so that every layer
//! (store, indexer, test backends) agrees on field names.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum::{Display, EnumString};

use crate::error::MnemoError;

/// Payload attached to a stored point.
pub type Payload = serde_json::Map<String, Value>;

/// Payload field names.
pub mod fields {
    pub const ROLE: &str = "role";
    pub const CONTENT: &str = "content";
    pub const TAGS: &str = "tags";
    pub const TIMESTAMP: &str = "timestamp";
    pub const TIMESTAMP_MS: &str = "timestamp_ms";
    pub const METADATA: &str = "metadata";
    pub const PATH: &str = "path";
    pub const PROJECT_ROOT: &str = "project_root";
    pub const LANGUAGE: &str = "language";
    pub const MTIME: &str = "mtime";
    pub const TAG: &str = "tag";
    pub const INDEXED_AT: &str = "indexed_at";
    pub const SIZE_BYTES: &str = "size_bytes";
}

/// Who produced a stored record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    User,
    Assistant,
    System,
    /// Indexed project files. Never valid for conversational messages.
    Project,
}

impl Role {
    /// Roles a conversational message may carry.
    pub const CONVERSATIONAL: [Role; 3] = [Role::User, Role::Assistant, Role::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Project => "project",
        }
    }
}

/// Whether the active conversation tag is applied to new messages implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TaggingMode {
    #[default]
    Automatic,
    Manual,
}

/// Format a timestamp the way it is persisted: RFC 3339, UTC, microseconds.
///
/// The fixed width keeps lexical order equal to chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A stored conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque unique identifier (UUID v4), immutable.
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Similarity score, populated on search results only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Message {
    /// Create a new message with a fresh ID and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tags: Vec::new(),
            // Persisted with microsecond precision.
            timestamp: Utc::now().trunc_subsecs(6),
            metadata: BTreeMap::new(),
            score: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Build the backend payload mirroring this message.
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert(fields::ROLE.into(), json!(self.role.as_str()));
        payload.insert(fields::CONTENT.into(), json!(self.content));
        payload.insert(fields::TAGS.into(), json!(self.tags));
        payload.insert(fields::TIMESTAMP.into(), json!(format_timestamp(&self.timestamp)));
        payload.insert(
            fields::TIMESTAMP_MS.into(),
            json!(self.timestamp.timestamp_millis()),
        );
        payload.insert(fields::METADATA.into(), json!(self.metadata));
        payload
    }

    /// Rebuild a message from a stored point.
    pub fn from_payload(id: &str, payload: &Payload) -> Result<Self, MnemoError> {
        let role = payload
            .get(fields::ROLE)
            .and_then(Value::as_str)
            .and_then(|r| r.parse::<Role>().ok())
            .ok_or_else(|| MnemoError::Internal(format!("point {id} has no valid role")))?;
        let content = payload
            .get(fields::CONTENT)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let tags = payload
            .get(fields::TAGS)
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let timestamp = payload_timestamp(payload, fields::TIMESTAMP)
            .or_else(|| {
                payload
                    .get(fields::TIMESTAMP_MS)
                    .and_then(Value::as_i64)
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            })
            .ok_or_else(|| MnemoError::Internal(format!("point {id} has no timestamp")))?;
        let metadata = payload
            .get(fields::METADATA)
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id: id.to_string(),
            role,
            content,
            tags,
            timestamp,
            metadata,
            score: None,
        })
    }
}

/// An indexed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Deterministic ID derived from the absolute path.
    pub id: String,
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    /// Absolute project root the file was indexed under.
    pub project_root: String,
    pub content: String,
    pub language: String,
    /// Filesystem modification time at index time (Unix milliseconds).
    pub mtime: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub indexed_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl ProjectFile {
    /// Derive the point ID for an absolute file path.
    pub fn id_for_path(absolute_path: &str) -> String {
        uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, absolute_path.as_bytes()).to_string()
    }

    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert(fields::ROLE.into(), json!(Role::Project.as_str()));
        payload.insert(fields::CONTENT.into(), json!(self.content));
        payload.insert(fields::PATH.into(), json!(self.path));
        payload.insert(fields::PROJECT_ROOT.into(), json!(self.project_root));
        payload.insert(fields::LANGUAGE.into(), json!(self.language));
        payload.insert(fields::MTIME.into(), json!(self.mtime));
        payload.insert(fields::TAG.into(), json!(self.tag));
        // Tags mirror the single file tag so tag filters work across record kinds.
        payload.insert(
            fields::TAGS.into(),
            json!(self.tag.iter().collect::<Vec<_>>()),
        );
        payload.insert(fields::INDEXED_AT.into(), json!(format_timestamp(&self.indexed_at)));
        payload.insert(fields::TIMESTAMP.into(), json!(format_timestamp(&self.indexed_at)));
        payload.insert(
            fields::TIMESTAMP_MS.into(),
            json!(self.indexed_at.timestamp_millis()),
        );
        payload.insert(fields::SIZE_BYTES.into(), json!(self.size_bytes));
        payload
    }

    pub fn from_payload(id: &str, payload: &Payload) -> Result<Self, MnemoError> {
        let str_field = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let path = str_field(fields::PATH)
            .ok_or_else(|| MnemoError::Internal(format!("project point {id} has no path")))?;

        Ok(Self {
            id: id.to_string(),
            path,
            project_root: str_field(fields::PROJECT_ROOT).unwrap_or_default(),
            content: str_field(fields::CONTENT).unwrap_or_default(),
            language: str_field(fields::LANGUAGE).unwrap_or_else(|| "text".to_string()),
            mtime: payload.get(fields::MTIME).and_then(Value::as_i64).unwrap_or(0),
            tag: str_field(fields::TAG),
            indexed_at: payload_timestamp(payload, fields::INDEXED_AT).unwrap_or_default(),
            size_bytes: payload
                .get(fields::SIZE_BYTES)
                .and_then(Value::as_u64)
                .unwrap_or(0),
        })
    }
}

fn payload_timestamp(payload: &Payload, key: &str) -> Option<DateTime<Utc>> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// A point as written to the vector backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A point returned from a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// Aggregate counts over the collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_vectors: u64,
    pub messages_by_role: BTreeMap<String, u64>,
    pub project_files: u64,
    pub sampled_at: DateTime<Utc>,
}

impl MemoryStats {
    /// Total conversational messages across roles.
    pub fn total_messages(&self) -> u64 {
        self.messages_by_role.values().sum()
    }
}

/// A file the indexer could not process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of an index or update pass over a project tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub excluded: usize,
    pub oversized: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FileFailure>,
}

impl IndexReport {
    /// Files written to the backend during this pass.
    pub fn indexed(&self) -> usize {
        self.added + self.updated
    }

    pub fn record_failure(&mut self, path: impl Into<String>, error: impl ToString) {
        self.failed += 1;
        self.failures.push(FileFailure {
            path: path.into(),
            error: error.to_string(),
        });
    }

    /// Non-fatal summary error when some files failed.
    pub fn partial_failure(&self) -> Option<MnemoError> {
        (self.failed > 0).then(|| MnemoError::PartialFailure {
            succeeded: self.indexed(),
            failed: self.failed,
        })
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Embedding,
    VectorStore,
}
