// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store adapter for a Qdrant-compatible REST backend.
//!
//! [`QdrantStore`] implements [`mnemo_core::VectorStore`] over plain HTTP:
//! collection management, upsert, similarity search, paginated scroll,
//! count, and filtered delete.

pub mod client;
pub mod filter;
mod wire;

pub use client::QdrantStore;
