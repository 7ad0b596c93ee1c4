// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring the full memory stack against in-memory backends.

use std::sync::Arc;

use mnemo_config::{IndexerConfig, MemoryConfig};
use mnemo_core::MnemoError;
use mnemo_gateway::{Dispatcher, ToolCallResponse, ToolContext};
use mnemo_memory::{ActivityLog, ConversationStore, ProjectIndexer, SessionState, StatsCollector};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::embedder::CountingEmbedder;
use crate::vector_store::InMemoryVectorStore;

pub const TEST_COLLECTION: &str = "test_memory";

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    dimensions: usize,
    memory: MemoryConfig,
    indexer: IndexerConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            dimensions: 64,
            memory: MemoryConfig::default(),
            indexer: IndexerConfig::default(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_memory_config(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_indexer_config(mut self, indexer: IndexerConfig) -> Self {
        self.indexer = indexer;
        self
    }

    /// Build every component and create the collection.
    pub async fn build(self) -> Result<TestHarness, MnemoError> {
        let vectors = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(CountingEmbedder::new(self.dimensions));

        let store = Arc::new(ConversationStore::new(
            vectors.clone(),
            embedder.clone(),
            TEST_COLLECTION,
            &self.memory,
        )?);
        store.initialize().await?;
        vectors.clear_calls().await;

        let indexer = Arc::new(ProjectIndexer::new(
            vectors.clone(),
            embedder.clone(),
            TEST_COLLECTION,
            &self.indexer,
        ));
        let session = Arc::new(SessionState::new());
        let activity = Arc::new(ActivityLog::new(self.memory.activity_log_len));
        let stats = Arc::new(StatsCollector::new(
            store.clone(),
            self.memory.stats_history_len,
        ));
        let cancel = CancellationToken::new();

        let context = ToolContext {
            store: store.clone(),
            indexer: indexer.clone(),
            session: session.clone(),
            stats: stats.clone(),
            activity: activity.clone(),
            cancel: cancel.clone(),
        };
        let dispatcher = mnemo_gateway::build_dispatcher(&context);

        Ok(TestHarness {
            vectors,
            embedder,
            store,
            indexer,
            session,
            activity,
            stats,
            dispatcher,
            cancel,
        })
    }
}

/// A complete memory stack over [`InMemoryVectorStore`] and [`CountingEmbedder`].
pub struct TestHarness {
    pub vectors: Arc<InMemoryVectorStore>,
    pub embedder: Arc<CountingEmbedder>,
    pub store: Arc<ConversationStore>,
    pub indexer: Arc<ProjectIndexer>,
    pub session: Arc<SessionState>,
    pub activity: Arc<ActivityLog>,
    pub stats: Arc<StatsCollector>,
    pub dispatcher: Arc<Dispatcher>,
    pub cancel: CancellationToken,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default configuration.
    pub async fn new() -> Result<Self, MnemoError> {
        Self::builder().build().await
    }

    /// Dispatch a tool by name.
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<Value, MnemoError> {
        self.dispatcher.dispatch(tool, arguments).await
    }

    /// Send a full envelope with `id` through the dispatcher.
    pub async fn call_envelope(&self, id: &str, tool: &str, arguments: Value) -> ToolCallResponse {
        self.dispatcher
            .handle_value(json!({
                "id": id,
                "type": "tool_call",
                "data": {"name": tool, "arguments": arguments},
            }))
            .await
    }

    /// Store a message through the dispatcher and return its ID.
    pub async fn add_message(&self, role: &str, content: &str) -> Result<String, MnemoError> {
        let result = self
            .call("add_message", json!({"role": role, "content": content}))
            .await?;
        result["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| MnemoError::Internal("add_message returned no id".into()))
    }
}
