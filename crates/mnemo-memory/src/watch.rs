// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling watch loop over [`ProjectIndexer::update_project`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mnemo_core::MnemoError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::indexer::ProjectIndexer;

/// Re-index `root` every `interval` until `cancel` fires.
///
/// The first pass runs immediately. Per-cycle errors are logged and the loop
/// continues with the next tick. Returns the number of completed cycles.
pub async fn watch_project(
    indexer: Arc<ProjectIndexer>,
    root: PathBuf,
    tag: Option<String>,
    interval: Duration,
    cancel: CancellationToken,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut cycles = 0u64;
    info!(root = %root.display(), interval_secs = interval.as_secs(), "watching project");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match indexer.update_project(&root, tag.as_deref(), &cancel).await {
                    Ok(report) => {
                        cycles += 1;
                        if report.indexed() > 0 {
                            info!(
                                added = report.added,
                                updated = report.updated,
                                "watch cycle indexed changes"
                            );
                        } else {
                            debug!(unchanged = report.unchanged, "watch cycle found no changes");
                        }
                    }
                    Err(MnemoError::Cancelled) => break,
                    Err(e) => {
                        cycles += 1;
                        warn!(error = %e, "watch cycle failed, retrying next interval");
                    }
                }
            }
            _ = cancel.cancelled() => break,
        }
    }

    info!(root = %root.display(), cycles, "project watch stopped");
    cycles
}
