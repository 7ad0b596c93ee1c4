// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-lifetime session state: the active conversation tag and tagging mode.

use mnemo_core::TaggingMode;
use serde::Serialize;
use tokio::sync::Mutex;

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionSnapshot {
    /// Empty string means no active tag.
    pub tag: String,
    pub mode: TaggingMode,
}

/// Session state shared by every request handler.
///
/// Tag and mode sit behind one lock so a reader never observes a torn pair.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: Mutex<SessionSnapshot>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.clone()
    }

    pub async fn tag(&self) -> String {
        self.inner.lock().await.tag.clone()
    }

    /// Replace the active tag, returning the previous one.
    pub async fn set_tag(&self, tag: impl Into<String>) -> String {
        let tag = tag.into().trim().to_string();
        std::mem::replace(&mut self.inner.lock().await.tag, tag)
    }

    pub async fn mode(&self) -> TaggingMode {
        self.inner.lock().await.mode
    }

    pub async fn set_mode(&self, mode: TaggingMode) {
        self.inner.lock().await.mode = mode;
    }

    /// Tags for a new message: the explicit tags, plus the active tag in
    /// automatic mode.
    pub async fn effective_tags(&self, explicit: Vec<String>) -> Vec<String> {
        let state = self.inner.lock().await;
        let mut tags = explicit;
        if state.mode == TaggingMode::Automatic
            && !state.tag.is_empty()
            && !tags.contains(&state.tag)
        {
            tags.push(state.tag.clone());
        }
        tags
    }
}
