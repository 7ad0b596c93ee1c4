// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires configuration into a running memory stack.

use std::sync::Arc;

use mnemo_config::MnemoConfig;
use mnemo_core::{EmbeddingAdapter, MnemoError, PluginAdapter, VectorStore};
use mnemo_gateway::{Dispatcher, ToolContext};
use mnemo_memory::{
    build_embedder, ActivityLog, ConversationStore, ProjectIndexer, SessionState, StatsCollector,
};
use mnemo_vector::QdrantStore;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Every long-lived component the CLI and the transports share.
pub struct Engine {
    pub ctx: ToolContext,
    pub dispatcher: Arc<Dispatcher>,
}

impl Engine {
    /// Connect to the configured vector backend and embedding provider.
    pub async fn connect(
        config: &MnemoConfig,
        cancel: CancellationToken,
    ) -> Result<Self, MnemoError> {
        let vectors = QdrantStore::from_config(&config.vector)?;
        info!(
            backend = vectors.name(),
            url = %config.vector.url,
            collection = %config.vector.collection,
            "vector backend configured"
        );
        let embedder = build_embedder(&config.embedding)?;
        info!(
            provider = embedder.name(),
            dimensions = embedder.dimensions(),
            "embedding provider configured"
        );
        Self::assemble(Arc::new(vectors), embedder, config, cancel).await
    }

    /// Build the stack over explicit adapters and create the collection.
    pub async fn assemble(
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: &MnemoConfig,
        cancel: CancellationToken,
    ) -> Result<Self, MnemoError> {
        let collection = config.vector.collection.clone();
        let store = Arc::new(ConversationStore::new(
            vectors.clone(),
            embedder.clone(),
            collection.clone(),
            &config.memory,
        )?);
        store.initialize().await?;

        let indexer = Arc::new(ProjectIndexer::new(
            vectors,
            embedder,
            collection,
            &config.indexer,
        ));
        let stats = Arc::new(StatsCollector::new(
            store.clone(),
            config.memory.stats_history_len,
        ));

        let ctx = ToolContext {
            store,
            indexer,
            session: Arc::new(SessionState::new()),
            stats,
            activity: Arc::new(ActivityLog::new(config.memory.activity_log_len)),
            cancel,
        };
        let dispatcher = mnemo_gateway::build_dispatcher(&ctx);
        Ok(Self { ctx, dispatcher })
    }
}
