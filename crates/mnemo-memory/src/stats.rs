// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic stats sampling with a bounded in-memory history.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use mnemo_core::{MemoryStats, MnemoError};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::ConversationStore;

/// Samples [`MemoryStats`] from the store and keeps the most recent `capacity` samples.
pub struct StatsCollector {
    store: Arc<ConversationStore>,
    history: Mutex<VecDeque<MemoryStats>>,
    capacity: usize,
}

impl StatsCollector {
    pub fn new(store: Arc<ConversationStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            store,
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Take one sample, append it to the history, and publish gauges.
    ///
    /// The backend is queried before the history lock is taken.
    pub async fn sample(&self) -> Result<MemoryStats, MnemoError> {
        let stats = self.store.stats().await?;
        publish(&stats);
        {
            let mut history = self.history.lock().await;
            if history.len() == self.capacity {
                history.pop_front();
            }
            history.push_back(stats.clone());
        }
        debug!(total = stats.total_vectors, "sampled memory stats");
        Ok(stats)
    }

    /// Samples in chronological order.
    pub async fn history(&self) -> Vec<MemoryStats> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn latest(&self) -> Option<MemoryStats> {
        self.history.lock().await.back().cloned()
    }

    /// Sample every `interval` until cancelled. Sampling failures are logged.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sample().await {
                        warn!(error = %e, "stats sampling failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("stats collector shutting down");
                    break;
                }
            }
        }
    }
}

fn publish(stats: &MemoryStats) {
    metrics::gauge!("mnemo_vectors_total").set(stats.total_vectors as f64);
    for (role, count) in &stats.messages_by_role {
        metrics::gauge!("mnemo_messages", "role" => role.clone()).set(*count as f64);
    }
    metrics::gauge!("mnemo_project_files").set(stats.project_files as f64);
}
