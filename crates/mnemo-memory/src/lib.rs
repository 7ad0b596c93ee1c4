// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation memory engine for Mnemo.
//!
//! Turns raw text into stored, queryable vectors and keeps a project file
//! corpus incrementally in sync with the filesystem.
//!
//! ## Architecture
//!
//! - **HashEmbedder / OllamaEmbedder**: pluggable `text -> vector` providers
//! - **ConversationStore**: message add, search, history, time-range deletes, clears
//! - **ProjectIndexer**: Unseen/Stale/Fresh incremental indexing of a directory tree
//! - **watch_project**: cooperative polling loop over `ProjectIndexer::update_project`
//! - **SessionState**: active conversation tag and tagging mode
//! - **StatsCollector / ActivityLog**: bounded in-memory histories for observability

pub mod activity;
pub mod embedder;
pub mod indexer;
pub mod language;
pub mod session;
pub mod stats;
pub mod store;
pub mod watch;
pub mod window;

pub use activity::{ActivityEntry, ActivityLog};
pub use embedder::{build_embedder, HashEmbedder, OllamaEmbedder};
pub use indexer::ProjectIndexer;
pub use session::SessionState;
pub use stats::StatsCollector;
pub use store::{ConversationStore, HistoryFilter};
pub use watch::watch_project;
pub use window::{Period, TimeWindow};
