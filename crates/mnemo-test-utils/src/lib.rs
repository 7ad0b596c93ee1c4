// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Mnemo integration tests.
//!
//! Fast, deterministic backends so tests run without a vector database or an
//! embedding service.
//!
//! # Components
//!
//! - [`InMemoryVectorStore`] - filter-evaluating, cosine-ranking vector store with call recording
//! - [`CountingEmbedder`] - deterministic embedder that counts computations
//! - [`TestHarness`] - store, indexer, session, and dispatcher wired together

pub mod embedder;
pub mod harness;
pub mod vector_store;

pub use embedder::CountingEmbedder;
pub use harness::{TestHarness, TEST_COLLECTION};
pub use vector_store::{InMemoryVectorStore, StoreCall, StoreOp};
