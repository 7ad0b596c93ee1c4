// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation memory store.
//!
//! Messages and project files share one collection. Every operation that
//! targets messages excludes `role = project` points, and project-file
//! clears constrain to them, so the two record kinds can be managed
//! independently.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use mnemo_config::MemoryConfig;
use mnemo_core::types::fields;
use mnemo_core::{
    Condition, EmbeddingAdapter, Filter, MemoryStats, Message, MnemoError, Point, Role,
    VectorStore,
};
use tracing::{debug, info, warn};

use crate::window::{Period, TimeWindow};

/// Optional criteria for [`ConversationStore::get_conversation_history`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub role: Option<Role>,
    /// Messages must carry every listed tag.
    pub tags: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Stores and retrieves conversational messages as vector points.
pub struct ConversationStore {
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingAdapter>,
    collection: String,
    default_search_limit: usize,
    default_history_limit: usize,
    offset: FixedOffset,
}

impl ConversationStore {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingAdapter>,
        collection: impl Into<String>,
        config: &MemoryConfig,
    ) -> Result<Self, MnemoError> {
        let offset = config.offset().ok_or_else(|| {
            MnemoError::Config(format!("invalid memory.utc_offset `{}`", config.utc_offset))
        })?;
        Ok(Self {
            vectors,
            embedder,
            collection: collection.into(),
            default_search_limit: config.default_search_limit.max(1),
            default_history_limit: config.default_history_limit.max(1),
            offset,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn vectors(&self) -> &Arc<dyn VectorStore> {
        &self.vectors
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingAdapter> {
        &self.embedder
    }

    /// Local offset used for calendar windows.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Create the collection if it does not exist yet.
    pub async fn initialize(&self) -> Result<(), MnemoError> {
        self.vectors
            .ensure_collection(&self.collection, self.embedder.dimensions())
            .await
    }

    /// Validate, embed, and store a message. Returns its ID.
    pub async fn add_message(&self, message: Message) -> Result<String, MnemoError> {
        if message.role == Role::Project {
            return Err(MnemoError::InvalidArgument(
                "invalid role `project`: expected one of user, assistant, system".into(),
            ));
        }
        if message.content.trim().is_empty() {
            return Err(MnemoError::InvalidArgument("content must not be empty".into()));
        }

        let vector = self.embedder.embed(&message.content).await?;
        let point = Point {
            id: message.id.clone(),
            vector,
            payload: message.to_payload(),
        };
        self.vectors.upsert(&self.collection, vec![point]).await?;
        debug!(id = %message.id, role = %message.role, "stored message");
        Ok(message.id)
    }

    /// Similarity search over everything in the collection.
    ///
    /// `None` or a non-positive `limit` falls back to the configured default.
    pub async fn search_messages(
        &self,
        query: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, MnemoError> {
        let limit = clamp_limit(limit, self.default_search_limit);
        let vector = self.embedder.embed(query).await?;
        let hits = self
            .vectors
            .query(&self.collection, &vector, limit, None)
            .await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| match Message::from_payload(&hit.id, &hit.payload) {
                Ok(mut message) => {
                    message.score = Some(hit.score);
                    Some(message)
                }
                Err(e) => {
                    warn!(id = %hit.id, error = %e, "skipping unreadable search hit");
                    None
                }
            })
            .collect())
    }

    /// Recent messages, newest first.
    ///
    /// The backend narrows by role, time range, and "any of the tags"; the
    /// store then keeps only messages carrying every requested tag, sorts by
    /// timestamp (backend order is not chronological) and truncates.
    pub async fn get_conversation_history(
        &self,
        limit: Option<i64>,
        filter: &HistoryFilter,
    ) -> Result<Vec<Message>, MnemoError> {
        let limit = clamp_limit(limit, self.default_history_limit);
        let mut backend_filter = match filter.role {
            Some(role) => Filter::new().must(Condition::eq(fields::ROLE, role.as_str())),
            None => messages_only(),
        };
        if !filter.tags.is_empty() {
            backend_filter = backend_filter.must(Condition::any_of(fields::TAGS, filter.tags.clone()));
        }
        if filter.start.is_some() || filter.end.is_some() {
            backend_filter = backend_filter.must(Condition::Range {
                key: fields::TIMESTAMP_MS.to_string(),
                gte: filter.start.map(|ts| ts.timestamp_millis() as f64),
                lt: None,
                lte: filter.end.map(|ts| ts.timestamp_millis() as f64),
            });
        }

        // Backend order is by point ID, so the whole matching set is needed
        // before the newest can be picked out.
        let matching = self
            .vectors
            .count(&self.collection, Some(&backend_filter))
            .await?;
        if matching == 0 {
            return Ok(Vec::new());
        }
        let points = self
            .vectors
            .scroll(
                &self.collection,
                Some(&backend_filter),
                usize::try_from(matching).unwrap_or(usize::MAX),
                None,
            )
            .await?;
        debug!(scanned = points.len(), "history scan");

        let mut messages: Vec<Message> = points
            .iter()
            .filter_map(|p| Message::from_payload(&p.id, &p.payload).ok())
            .filter(|m| filter.tags.iter().all(|t| m.tags.contains(t)))
            .collect();
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        messages.truncate(limit);
        Ok(messages)
    }

    /// Fetch one message by ID.
    pub async fn get_message(&self, id: &str) -> Result<Message, MnemoError> {
        let filter = messages_only().must(Condition::HasId(vec![id.to_string()]));
        let points = self
            .vectors
            .scroll(&self.collection, Some(&filter), 1, None)
            .await?;
        let point = points
            .first()
            .ok_or_else(|| MnemoError::NotFound(format!("message {id}")))?;
        Message::from_payload(&point.id, &point.payload)
    }

    /// Delete one message by ID.
    pub async fn delete_message(&self, id: &str) -> Result<(), MnemoError> {
        let filter = messages_only().must(Condition::HasId(vec![id.to_string()]));
        match self.vectors.delete(&self.collection, &filter).await? {
            0 => Err(MnemoError::NotFound(format!("message {id}"))),
            _ => Ok(()),
        }
    }

    /// Delete messages with `from <= timestamp <= to`. Project files are untouched.
    pub async fn delete_messages_by_time_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, MnemoError> {
        if from > to {
            return Err(MnemoError::InvalidArgument(format!(
                "start {from} is after end {to}"
            )));
        }
        let filter = messages_only().must(Condition::between(
            fields::TIMESTAMP_MS,
            from.timestamp_millis() as f64,
            to.timestamp_millis() as f64,
        ));
        let removed = self.vectors.delete(&self.collection, &filter).await?;
        info!(removed, %from, %to, "deleted messages by time range");
        Ok(removed)
    }

    /// Delete messages from the start of `period` (local time) until `now`.
    pub async fn delete_messages_in_period_at(
        &self,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<u64, MnemoError> {
        let TimeWindow { start, end } = period.window(now, self.offset);
        self.delete_messages_by_time_range(start, end).await
    }

    pub async fn delete_messages_in_period(&self, period: Period) -> Result<u64, MnemoError> {
        self.delete_messages_in_period_at(period, Utc::now()).await
    }

    pub async fn delete_messages_for_current_day(&self) -> Result<u64, MnemoError> {
        self.delete_messages_in_period(Period::Today).await
    }

    pub async fn delete_messages_for_current_week(&self) -> Result<u64, MnemoError> {
        self.delete_messages_in_period(Period::Week).await
    }

    pub async fn delete_messages_for_current_month(&self) -> Result<u64, MnemoError> {
        self.delete_messages_in_period(Period::Month).await
    }

    /// Remove every conversational message, keeping project files.
    pub async fn clear_messages(&self) -> Result<u64, MnemoError> {
        self.vectors.delete(&self.collection, &messages_only()).await
    }

    /// Remove every indexed project file, keeping messages.
    pub async fn clear_project_files(&self) -> Result<u64, MnemoError> {
        self.vectors.delete(&self.collection, &project_files_only()).await
    }

    /// Remove indexed project files carrying `tag`.
    pub async fn clear_project_files_by_tag(&self, tag: &str) -> Result<u64, MnemoError> {
        let filter = project_files_only().must(Condition::eq(fields::TAG, tag));
        self.vectors.delete(&self.collection, &filter).await
    }

    /// Remove everything in the collection.
    pub async fn clear_all_memories(&self) -> Result<u64, MnemoError> {
        self.vectors.delete(&self.collection, &Filter::new()).await
    }

    /// Aggregate counts computed from the backend.
    pub async fn stats(&self) -> Result<MemoryStats, MnemoError> {
        let total_vectors = self.vectors.count(&self.collection, None).await?;
        let mut stats = MemoryStats {
            total_vectors,
            sampled_at: Utc::now(),
            ..MemoryStats::default()
        };
        for role in Role::CONVERSATIONAL {
            let filter = Filter::new().must(Condition::eq(fields::ROLE, role.as_str()));
            let count = self.vectors.count(&self.collection, Some(&filter)).await?;
            stats.messages_by_role.insert(role.to_string(), count);
        }
        stats.project_files = self
            .vectors
            .count(&self.collection, Some(&project_files_only()))
            .await?;
        Ok(stats)
    }
}

fn messages_only() -> Filter {
    Filter::new().must_not(Condition::eq(fields::ROLE, Role::Project.as_str()))
}

fn project_files_only() -> Filter {
    Filter::new().must(Condition::eq(fields::ROLE, Role::Project.as_str()))
}

fn clamp_limit(limit: Option<i64>, default: usize) -> usize {
    match limit {
        Some(n) if n > 0 => n as usize,
        _ => default,
    }
}
