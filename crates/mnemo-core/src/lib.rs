// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mnemo conversation memory engine.
//!
//! This crate provides the error taxonomy, the domain types shared by every
//! layer (messages, project files, payload filters, stats), and the adapter
//! traits that the embedding providers and the vector backend implement.

pub mod error;
pub mod filter;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, MnemoError};
pub use filter::{Condition, Filter};
pub use types::{
    AdapterType, HealthStatus, IndexReport, MemoryStats, Message, Point, ProjectFile, Role,
    ScoredPoint, TaggingMode,
};

pub use traits::{EmbeddingAdapter, PluginAdapter, VectorStore};
