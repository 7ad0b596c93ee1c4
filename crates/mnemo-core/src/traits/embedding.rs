// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;

/// Maps text to a fixed-dimension vector.
///
/// Every vector returned by [`embed`](EmbeddingAdapter::embed) has exactly
/// [`dimensions`](EmbeddingAdapter::dimensions) components; implementations
/// return an error rather than a vector of another length.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Length of every produced vector.
    fn dimensions(&self) -> usize;

    /// Generates the embedding for `text`. Empty text is valid input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MnemoError>;
}
