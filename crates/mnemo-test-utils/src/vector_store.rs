// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process vector backend.
//!
//! `InMemoryVectorStore` implements `VectorStore` with exact cosine ranking
//! and local filter evaluation, records every call, and can be switched into
//! an unavailable state to exercise backend-failure paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use mnemo_core::types::Payload;
use mnemo_core::{
    AdapterType, Filter, HealthStatus, MnemoError, PluginAdapter, Point, ScoredPoint, VectorStore,
};

/// Backend operation recorded by [`InMemoryVectorStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    EnsureCollection,
    Upsert,
    Query,
    Scroll,
    Count,
    Delete,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub collection: String,
    /// Points written by an upsert; zero for other operations.
    pub points: usize,
}

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    /// Ordered by ID so scrolls are deterministic.
    points: BTreeMap<String, Point>,
}

/// Vector store that keeps every collection in memory.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: Mutex<HashMap<String, Collection>>,
    calls: Mutex<Vec<StoreCall>>,
    unavailable: AtomicBool,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with `BackendUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().await.clone()
    }

    /// Number of recorded calls of `op`.
    pub async fn call_count(&self, op: StoreOp) -> usize {
        self.calls.lock().await.iter().filter(|c| c.op == op).count()
    }

    /// Total points written across all upserts.
    pub async fn points_written(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.op == StoreOp::Upsert)
            .map(|c| c.points)
            .sum()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Stored point by ID, vector included.
    pub async fn point(&self, collection: &str, id: &str) -> Option<Point> {
        self.collections
            .lock()
            .await
            .get(collection)?
            .points
            .get(id)
            .cloned()
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map_or(0, |c| c.points.len())
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }

    async fn begin(&self, op: StoreOp, collection: &str, points: usize) -> Result<(), MnemoError> {
        self.calls.lock().await.push(StoreCall {
            op,
            collection: collection.to_string(),
            points,
        });
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MnemoError::BackendUnavailable {
                message: "in-memory store switched off".into(),
                source: None,
            });
        }
        Ok(())
    }
}

fn missing(collection: &str) -> MnemoError {
    MnemoError::InvalidArgument(format!("collection `{collection}` does not exist"))
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn project(payload: &Payload, fields: Option<&[&str]>) -> Payload {
    match fields {
        None => payload.clone(),
        Some(fields) => payload
            .iter()
            .filter(|(k, _)| fields.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

fn matching<'a>(
    collection: &'a Collection,
    filter: Option<&'a Filter>,
) -> impl Iterator<Item = &'a Point> + 'a {
    collection
        .points
        .values()
        .filter(move |p| filter.is_none_or(|f| f.matches(&p.id, &p.payload)))
}

#[async_trait]
impl PluginAdapter for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("switched off".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<(), MnemoError> {
        self.begin(StoreOp::EnsureCollection, collection, 0).await?;
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                dimension,
                points: BTreeMap::new(),
            });
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), MnemoError> {
        self.begin(StoreOp::Upsert, collection, points.len()).await?;
        let mut collections = self.collections.lock().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimension) {
            return Err(MnemoError::InvalidArgument(format!(
                "point {} has dimension {}, collection expects {}",
                bad.id,
                bad.vector.len(),
                target.dimension
            )));
        }
        for point in points {
            target.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>, MnemoError> {
        self.begin(StoreOp::Query, collection, 0).await?;
        let collections = self.collections.lock().await;
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;
        let mut hits: Vec<ScoredPoint> = matching(target, filter)
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: usize,
        fields: Option<&[&str]>,
    ) -> Result<Vec<Point>, MnemoError> {
        self.begin(StoreOp::Scroll, collection, 0).await?;
        let collections = self.collections.lock().await;
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(matching(target, filter)
            .take(limit)
            .map(|p| Point {
                id: p.id.clone(),
                vector: Vec::new(),
                payload: project(&p.payload, fields),
            })
            .collect())
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64, MnemoError> {
        self.begin(StoreOp::Count, collection, 0).await?;
        let collections = self.collections.lock().await;
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(matching(target, filter).count() as u64)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64, MnemoError> {
        self.begin(StoreOp::Delete, collection, 0).await?;
        let mut collections = self.collections.lock().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        let before = target.points.len();
        target.points.retain(|id, p| !filter.matches(id, &p.payload));
        Ok((before - target.points.len()) as u64)
    }
}
