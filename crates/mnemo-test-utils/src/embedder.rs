// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedder that counts how often it is asked to embed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use mnemo_core::{AdapterType, EmbeddingAdapter, HealthStatus, MnemoError, PluginAdapter};
use mnemo_memory::HashEmbedder;

/// Wraps [`HashEmbedder`], counting calls and optionally failing them.
#[derive(Debug)]
pub struct CountingEmbedder {
    inner: HashEmbedder,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dimensions),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Embedding computations so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    /// While set, `embed` fails with `BackendUnavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for CountingEmbedder {
    fn name(&self) -> &str {
        "counting"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for CountingEmbedder {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MnemoError::BackendUnavailable {
                message: "embedding provider switched off".into(),
                source: None,
            });
        }
        Ok(self.inner.embed_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_successes_and_failures() {
        let embedder = CountingEmbedder::new(16);
        let v = embedder.embed("hello").await.unwrap();
        assert_eq!(v.len(), 16);
        embedder.set_failing(true);
        assert!(embedder.embed("hello").await.is_err());
        assert_eq!(embedder.calls(), 2);
        embedder.reset();
        assert_eq!(embedder.calls(), 0);
    }
}
