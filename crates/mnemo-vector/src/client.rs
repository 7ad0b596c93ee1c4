// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the vector backend.
//!
//! Provides [`QdrantStore`], which owns request construction, the optional
//! `api-key` header, the per-request timeout, and the mapping of transport
//! and HTTP failures onto [`MnemoError`].

use std::time::Duration;

use async_trait::async_trait;
use mnemo_config::VectorConfig;
use mnemo_core::types::Payload;
use mnemo_core::{
    AdapterType, Filter, HealthStatus, MnemoError, PluginAdapter, Point, ScoredPoint, VectorStore,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::filter;
use crate::wire::{self, CountResult, Envelope, ErrorBody, ScrollPage, WireScoredPoint};

/// Largest page requested per scroll call.
const SCROLL_PAGE_SIZE: usize = 256;

/// Vector store backed by a Qdrant-compatible REST API.
#[derive(Debug, Clone)]
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl QdrantStore {
    /// Creates a client for `base_url`.
    ///
    /// `api_key`, when set, is sent as the `api-key` header on every request.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, MnemoError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key).map_err(|e| {
                    MnemoError::Config(format!("invalid vector api key header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| MnemoError::backend("failed to build vector backend client", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &VectorConfig) -> Result<Self, MnemoError> {
        Self::new(&config.url, config.api_key.as_deref(), config.timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends a request and returns the raw response, mapping transport errors.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, MnemoError> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MnemoError::Timeout {
                    duration: self.timeout,
                }
            } else {
                MnemoError::backend(format!("{method} {path} failed: {e}"), e)
            }
        })?;
        debug!(%method, path, status = %response.status(), "vector backend response");
        Ok(response)
    }

    /// Sends a request, rejects non-2xx statuses, and decodes `result`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, MnemoError> {
        let response = self.send(method, path, body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            MnemoError::backend(format!("malformed response from {path}: {e}"), e)
        })?;
        Ok(envelope.result)
    }

    async fn scroll_page(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: usize,
        offset: Option<&Value>,
        fields: Option<&[&str]>,
    ) -> Result<ScrollPage, MnemoError> {
        let mut body = json!({
            "limit": limit,
            "with_payload": fields.map_or(json!(true), |f| json!(f)),
            "with_vector": false,
        });
        if let Some(filter) = filter::optional(filter) {
            body["filter"] = filter;
        }
        if let Some(offset) = offset {
            body["offset"] = offset.clone();
        }
        self.call(
            Method::POST,
            &format!("/collections/{collection}/points/scroll"),
            Some(&body),
        )
        .await
    }
}

/// Map a non-success status to the error taxonomy.
///
/// 4xx means the backend rejected what was sent; anything else is a backend fault.
async fn status_error(status: StatusCode, response: reqwest::Response) -> MnemoError {
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.status.error)
        .unwrap_or(body);
    if status.is_client_error() {
        MnemoError::InvalidArgument(format!("vector backend rejected request ({status}): {detail}"))
    } else {
        warn!(%status, detail = %detail, "vector backend error");
        MnemoError::BackendUnavailable {
            message: format!("vector backend returned {status}: {detail}"),
            source: None,
        }
    }
}

#[async_trait]
impl PluginAdapter for QdrantStore {
    fn name(&self) -> &str {
        "qdrant"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        match self.send(Method::GET, "/collections", None).await {
            Ok(response) if response.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(response) => Ok(HealthStatus::Unhealthy(format!(
                "vector backend returned {}",
                response.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), MnemoError> {
        let path = format!("/collections/{collection}");
        let response = self.send(Method::GET, &path, None).await?;
        match response.status() {
            s if s.is_success() => return Ok(()),
            StatusCode::NOT_FOUND => {}
            s => return Err(status_error(s, response).await),
        }

        let body = json!({"vectors": {"size": dimension, "distance": "Cosine"}});
        let response = self.send(Method::PUT, &path, Some(&body)).await?;
        match response.status() {
            s if s.is_success() => {
                debug!(collection, dimension, "created collection");
                Ok(())
            }
            // Created concurrently by another process.
            StatusCode::CONFLICT => Ok(()),
            s => Err(status_error(s, response).await),
        }
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), MnemoError> {
        if points.is_empty() {
            return Ok(());
        }
        // The backend rejects batch writes that omit the explicit id list.
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        let body = json!({"points": points, "ids": ids});
        let _: Value = self
            .call(
                Method::PUT,
                &format!("/collections/{collection}/points?wait=true"),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>, MnemoError> {
        let mut body = json!({"vector": vector, "limit": limit, "with_payload": true});
        if let Some(filter) = filter::optional(filter) {
            body["filter"] = filter;
        }
        let hits: Vec<WireScoredPoint> = self
            .call(
                Method::POST,
                &format!("/collections/{collection}/points/search"),
                Some(&body),
            )
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| ScoredPoint {
                id: wire::id_to_string(&hit.id),
                score: hit.score,
                payload: hit.payload.unwrap_or_default(),
            })
            .collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: usize,
        fields: Option<&[&str]>,
    ) -> Result<Vec<Point>, MnemoError> {
        let mut points = Vec::new();
        let mut offset: Option<Value> = None;
        while points.len() < limit {
            let page_size = (limit - points.len()).min(SCROLL_PAGE_SIZE);
            let page = self
                .scroll_page(collection, filter, page_size, offset.as_ref(), fields)
                .await?;
            points.extend(page.points.into_iter().map(|record| Point {
                id: wire::id_to_string(&record.id),
                vector: Vec::new(),
                payload: record.payload.unwrap_or_else(Payload::new),
            }));
            match page.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }
        points.truncate(limit);
        Ok(points)
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64, MnemoError> {
        let mut body = json!({"exact": true});
        if let Some(filter) = filter::optional(filter) {
            body["filter"] = filter;
        }
        let result: CountResult = self
            .call(
                Method::POST,
                &format!("/collections/{collection}/points/count"),
                Some(&body),
            )
            .await?;
        Ok(result.count)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64, MnemoError> {
        // The delete endpoint does not report how many points it removed.
        let matched = self.count(collection, Some(filter)).await?;
        if matched == 0 {
            return Ok(0);
        }
        let body = json!({"filter": filter::to_json(filter)});
        let _: Value = self
            .call(
                Method::POST,
                &format!("/collections/{collection}/points/delete?wait=true"),
                Some(&body),
            )
            .await?;
        debug!(collection, removed = matched, "deleted points");
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::{Condition, ErrorKind};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn store(server: &MockServer) -> QdrantStore {
        QdrantStore::new(&server.uri(), None, Duration::from_secs(5)).unwrap()
    }

    fn ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"result": result, "status": "ok"}))
    }

    fn point(id: &str) -> Point {
        let mut payload = Payload::new();
        payload.insert("role".into(), json!("user"));
        Point {
            id: id.to_string(),
            vector: vec![0.1, 0.2],
            payload,
        }
    }

    #[tokio::test]
    async fn ensure_collection_creates_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/mem"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/mem"))
            .and(body_partial_json(
                json!({"vectors": {"size": 384, "distance": "Cosine"}}),
            ))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).ensure_collection("mem", 384).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_collection_is_silent_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/mem"))
            .respond_with(ok(json!({"status": "green"})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ok(json!(true)))
            .expect(0)
            .mount(&server)
            .await;

        store(&server).ensure_collection("mem", 384).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_sends_points_and_ids() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/collections/mem/points"))
            .and(query_param("wait", "true"))
            .and(body_partial_json(json!({"ids": ["a", "b"]})))
            .respond_with(ok(json!({"operation_id": 1, "status": "completed"})))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .upsert("mem", vec![point("a"), point("b")])
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["points"].as_array().unwrap().len(), 2);
        assert_eq!(body["points"][0]["id"], "a");
        assert_eq!(body["points"][0]["payload"]["role"], "user");
    }

    #[tokio::test]
    async fn rejected_write_is_invalid_argument() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": {"error": "Json deserialize error: missing field `ids`"}
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .upsert("mem", vec![point("a")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("missing field `ids`"), "{err}");
    }

    #[tokio::test]
    async fn server_error_is_backend_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = store(&server).count("mem", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }

    #[tokio::test]
    async fn unreachable_backend_is_backend_unavailable() {
        // Port 9 (discard) is not expected to host an HTTP server.
        let store = QdrantStore::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
        let err = store.ensure_collection("mem", 8).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }

    #[tokio::test]
    async fn query_maps_scored_points() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/search"))
            .and(body_partial_json(json!({
                "limit": 2,
                "with_payload": true,
                "filter": {"must": [{"key": "role", "match": {"value": "user"}}]},
            })))
            .respond_with(ok(json!([
                {"id": "a", "score": 0.9, "payload": {"content": "hello"}},
                {"id": 7, "score": 0.5, "payload": null},
            ])))
            .mount(&server)
            .await;

        let filter = Filter::new().must(Condition::eq("role", "user"));
        let hits = store(&server)
            .query("mem", &[1.0, 0.0], 2, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].payload["content"], "hello");
        assert_eq!(hits[1].id, "7");
        assert!(hits[1].payload.is_empty());
    }

    #[tokio::test]
    async fn scroll_follows_page_offsets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/scroll"))
            .respond_with(|req: &Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                let page = if body.get("offset").is_none() {
                    json!({"points": [{"id": "a", "payload": {}}], "next_page_offset": "b"})
                } else {
                    json!({"points": [{"id": "b", "payload": {}}], "next_page_offset": null})
                };
                ResponseTemplate::new(200).set_body_json(json!({"result": page}))
            })
            .expect(2)
            .mount(&server)
            .await;

        let points = store(&server).scroll("mem", None, 10, None).await.unwrap();
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn scroll_requests_selected_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/scroll"))
            .and(body_partial_json(json!({
                "with_payload": ["path", "mtime"],
                "with_vector": false,
            })))
            .respond_with(ok(json!({"points": [], "next_page_offset": null})))
            .expect(1)
            .mount(&server)
            .await;

        let points = store(&server)
            .scroll("mem", None, 10, Some(&["path", "mtime"]))
            .await
            .unwrap();
        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn delete_counts_then_deletes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/count"))
            .and(body_partial_json(json!({"exact": true})))
            .respond_with(ok(json!({"count": 3})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/delete"))
            .and(query_param("wait", "true"))
            .and(body_partial_json(json!({
                "filter": {"must": [{"key": "role", "match": {"value": "project"}}]}
            })))
            .respond_with(ok(json!({"status": "completed"})))
            .expect(1)
            .mount(&server)
            .await;

        let filter = Filter::new().must(Condition::eq("role", "project"));
        assert_eq!(store(&server).delete("mem", &filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn delete_skips_request_when_nothing_matches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/count"))
            .respond_with(ok(json!({"count": 0})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/delete"))
            .respond_with(ok(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        assert_eq!(store(&server).delete("mem", &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn api_key_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections"))
            .and(header("api-key", "secret"))
            .respond_with(ok(json!({"collections": []})))
            .expect(1)
            .mount(&server)
            .await;

        let store = QdrantStore::new(&server.uri(), Some("secret"), Duration::from_secs(5)).unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
