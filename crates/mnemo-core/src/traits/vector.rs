// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store adapter trait.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::filter::Filter;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Point, ScoredPoint};

/// Narrow contract to an external vector-storage service.
///
/// All calls are bounded by the adapter's timeout. Transport failures surface
/// as [`MnemoError::BackendUnavailable`]; rejected payloads as
/// [`MnemoError::InvalidArgument`].
#[async_trait]
pub trait VectorStore: PluginAdapter {
    /// Creates the collection if absent. Succeeds silently when present.
    async fn ensure_collection(&self, collection: &str, dimension: usize)
    -> Result<(), MnemoError>;

    /// Inserts or replaces points by ID.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), MnemoError>;

    /// Up to `limit` points ordered by descending similarity to `vector`.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>, MnemoError>;

    /// Up to `limit` points matching `filter`, in backend order.
    ///
    /// `fields` restricts the returned payload keys; `None` returns the full payload.
    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: usize,
        fields: Option<&[&str]>,
    ) -> Result<Vec<Point>, MnemoError>;

    /// Number of points matching `filter`.
    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64, MnemoError>;

    /// Removes every point matching `filter` and returns how many were removed.
    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64, MnemoError>;
}
