// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding providers.
//!
//! [`HashEmbedder`] is a local, deterministic feature-hashing embedder that
//! needs no model files or services. [`OllamaEmbedder`] calls an Ollama
//! server's `/api/embeddings` endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mnemo_config::{EmbeddingConfig, EmbeddingProvider};
use mnemo_core::{AdapterType, EmbeddingAdapter, HealthStatus, MnemoError, PluginAdapter};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Token hashed for empty input so the vector is never all zeros.
const EMPTY_TOKEN: &str = "\u{0}empty";

/// Feature-hashing embedder.
///
/// Each lowercase alphanumeric token is hashed with SHA-256 into one of
/// `dimensions` buckets with a hash-derived sign, and the result is
/// L2-normalized. Texts sharing words have positive cosine similarity.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Embed synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let lowered = text.to_lowercase();
        let mut tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .peekable();
        if tokens.peek().is_none() {
            self.accumulate(&mut vector, EMPTY_TOKEN);
        }
        for token in tokens {
            self.accumulate(&mut vector, token);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        } else {
            // Every token cancelled out; fall back to the sentinel direction.
            self.accumulate(&mut vector, EMPTY_TOKEN);
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], token: &str) {
        let digest = Sha256::digest(token.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

#[async_trait]
impl PluginAdapter for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        Ok(self.embed_text(text))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, MnemoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MnemoError::backend("failed to build embedding client", e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
            timeout,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> MnemoError {
        if e.is_timeout() {
            MnemoError::Timeout {
                duration: self.timeout,
            }
        } else {
            MnemoError::backend(format!("embedding request failed: {e}"), e)
        }
    }
}

#[async_trait]
impl PluginAdapter for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        let url = format!("{}/api/tags", self.base_url);
        Ok(match self.client.get(url).send().await {
            Ok(r) if r.status().is_success() => HealthStatus::Healthy,
            Ok(r) => HealthStatus::Unhealthy(format!("ollama returned {}", r.status())),
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingAdapter for OllamaEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MnemoError::BackendUnavailable {
                message: format!("ollama returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| MnemoError::backend(format!("malformed embedding response: {e}"), e))?;
        if parsed.embedding.len() != self.dimensions {
            return Err(MnemoError::BackendUnavailable {
                message: format!(
                    "model `{}` produced {} dimensions, configured for {}",
                    self.model,
                    parsed.embedding.len(),
                    self.dimensions
                ),
                source: None,
            });
        }
        debug!(model = %self.model, chars = text.len(), "embedded text");
        Ok(parsed.embedding)
    }
}

/// Build the embedding provider selected by configuration.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingAdapter>, MnemoError> {
    Ok(match config.provider {
        EmbeddingProvider::Hash => Arc::new(HashEmbedder::new(config.dimensions)),
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedder::new(
            &config.url,
            &config.model,
            config.dimensions,
            config.timeout(),
        )?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn hash_vectors_are_normalized_and_sized() {
        let embedder = HashEmbedder::new(384);
        for text in ["hello world", "", "   ", "Ünïcödé text"] {
            let v = embedder.embed_text(text);
            assert_eq!(v.len(), 384);
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5, "{text:?} norm {norm}");
        }
    }

    #[test]
    fn hash_is_deterministic_and_case_insensitive() {
        let embedder = HashEmbedder::new(64);
        assert_eq!(embedder.embed_text("Hello"), embedder.embed_text("hello"));
        assert_eq!(embedder.embed_text("a b"), embedder.embed_text("a  b"));
    }

    #[test]
    fn shared_words_score_higher() {
        let embedder = HashEmbedder::new(384);
        let query = embedder.embed_text("hello");
        let related = embedder.embed_text("hello world");
        let unrelated = embedder.embed_text("unrelated gibberish xyz");
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn ollama_embeds_via_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_json(json!({"model": "nomic-embed-text", "prompt": "hi"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.5, 0.5, 0.0]})),
            )
            .mount(&server)
            .await;

        let embedder =
            OllamaEmbedder::new(&server.uri(), "nomic-embed-text", 3, Duration::from_secs(5))
                .unwrap();
        assert_eq!(embedder.embed("hi").await.unwrap(), vec![0.5, 0.5, 0.0]);
    }

    #[tokio::test]
    async fn ollama_rejects_wrong_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [1.0]})))
            .mount(&server)
            .await;

        let embedder =
            OllamaEmbedder::new(&server.uri(), "m", 3, Duration::from_secs(5)).unwrap();
        let err = embedder.embed("hi").await.unwrap_err();
        assert_eq!(err.kind(), mnemo_core::ErrorKind::BackendUnavailable);
        assert!(err.to_string().contains("produced 1 dimensions, configured for 3"), "{err}");
    }

    #[tokio::test]
    async fn ollama_server_error_is_backend_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let embedder =
            OllamaEmbedder::new(&server.uri(), "m", 3, Duration::from_secs(5)).unwrap();
        let err = embedder.embed("hi").await.unwrap_err();
        assert_eq!(err.kind(), mnemo_core::ErrorKind::BackendUnavailable);
    }

    #[test]
    fn config_selects_provider() {
        let config = EmbeddingConfig::default();
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "hash");
        assert_eq!(embedder.dimensions(), 384);
    }
}
