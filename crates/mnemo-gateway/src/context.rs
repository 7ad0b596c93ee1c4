// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared services handed to every tool.

use std::sync::Arc;

use mnemo_memory::{ActivityLog, ConversationStore, ProjectIndexer, SessionState, StatsCollector};
use tokio_util::sync::CancellationToken;

/// Everything a tool may touch. Cheap to clone.
#[derive(Clone)]
pub struct ToolContext {
    pub store: Arc<ConversationStore>,
    pub indexer: Arc<ProjectIndexer>,
    pub session: Arc<SessionState>,
    pub stats: Arc<StatsCollector>,
    pub activity: Arc<ActivityLog>,
    /// Process shutdown signal, observed by long-running indexing calls.
    pub cancel: CancellationToken,
}
