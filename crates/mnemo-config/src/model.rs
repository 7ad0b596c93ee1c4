// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mnemo memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Top-level Mnemo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemoConfig {
    /// HTTP listener and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Vector backend connection settings.
    #[serde(default)]
    pub vector: VectorConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Conversation store and background task settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Project file indexer settings.
    #[serde(default)]
    pub indexer: IndexerConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bearer token required on `/v1/*` routes. `None` leaves them open.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            bearer_token: None,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Vector backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VectorConfig {
    /// Base URL of the Qdrant-compatible REST API.
    #[serde(default = "default_vector_url")]
    pub url: String,

    /// Sent as the `api-key` header when set.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Collection holding both messages and project files.
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_vector_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: default_vector_url(),
            api_key: None,
            collection: default_collection(),
            timeout_secs: default_vector_timeout_secs(),
        }
    }
}

impl VectorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_vector_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "conversation_memory".to_string()
}

fn default_vector_timeout_secs() -> u64 {
    10
}

/// Which embedding provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local deterministic feature hashing, no external service.
    #[default]
    Hash,
    /// Ollama `/api/embeddings` endpoint.
    Ollama,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Vector length. Must match the model when `provider = "ollama"`.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            dimensions: default_dimensions(),
            url: default_embedding_url(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_dimensions() -> usize {
    384
}

fn default_embedding_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

/// Conversation store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Result count for `search_similar_messages` when the caller omits `limit`.
    #[serde(default = "default_search_limit")]
    pub default_search_limit: usize,

    /// Result count for `get_conversation_history` when the caller omits `limit`.
    #[serde(default = "default_history_limit")]
    pub default_history_limit: usize,

    /// Fixed offset used to compute "today", "this week" and "this month".
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,

    /// Number of stats samples retained.
    #[serde(default = "default_stats_history_len")]
    pub stats_history_len: usize,

    /// Number of activity log entries retained.
    #[serde(default = "default_activity_log_len")]
    pub activity_log_len: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            default_search_limit: default_search_limit(),
            default_history_limit: default_history_limit(),
            utc_offset: default_utc_offset(),
            stats_interval_secs: default_stats_interval_secs(),
            stats_history_len: default_stats_history_len(),
            activity_log_len: default_activity_log_len(),
        }
    }
}

impl MemoryConfig {
    /// Parsed `utc_offset`. Validation guarantees this is `Some` for loaded configs.
    pub fn offset(&self) -> Option<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

/// Parse `+HH:MM`, `-HH:MM` or `Z` into a fixed offset.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn default_search_limit() -> usize {
    5
}

fn default_history_limit() -> usize {
    20
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_stats_interval_secs() -> u64 {
    60
}

fn default_stats_history_len() -> usize {
    120
}

fn default_activity_log_len() -> usize {
    200
}

/// Project file indexer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    /// Files larger than this are skipped and counted as oversized.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Seconds between change scans in watch mode.
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,

    /// Directory names never descended into. Hidden directories are always skipped.
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            watch_interval_secs: default_watch_interval_secs(),
            ignored_dirs: default_ignored_dirs(),
        }
    }
}

impl IndexerConfig {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

fn default_watch_interval_secs() -> u64 {
    30
}

fn default_ignored_dirs() -> Vec<String> {
    ["node_modules", "target", "__pycache__", "venv"]
        .into_iter()
        .map(String::from)
        .collect()
}
