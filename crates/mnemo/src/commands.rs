// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot memory commands.
//!
//! These call the store and indexer directly rather than going through the
//! tool-call wire protocol. Each returns the text to print on success.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mnemo_core::{IndexReport, Message, MnemoError, Role};
use mnemo_gateway::ToolContext;
use mnemo_memory::{watch_project, HistoryFilter, Period};

use crate::cli::{ClearScope, Commands};

/// Run a memory command. `serve` and `status` are handled by their own modules.
pub async fn execute(ctx: &ToolContext, command: Commands) -> Result<String, MnemoError> {
    match command {
        Commands::Add { role, content, tags } => {
            let role = parse_role(&role)?;
            let tags = ctx.session.effective_tags(tags).await;
            let id = ctx
                .store
                .add_message(Message::new(role, content).with_tags(tags))
                .await?;
            Ok(format!("stored {id}"))
        }
        Commands::Search { query, limit } => {
            let results = ctx.store.search_messages(&query, limit).await?;
            Ok(render_messages(&results, "no matches"))
        }
        Commands::History { limit, role, tags } => {
            let filter = HistoryFilter {
                role: role.as_deref().map(parse_role).transpose()?,
                tags,
                ..HistoryFilter::default()
            };
            let messages = ctx.store.get_conversation_history(limit, &filter).await?;
            Ok(render_messages(&messages, "no messages"))
        }
        Commands::Clear { scope } => {
            let deleted = match scope {
                ClearScope::Today => ctx.store.delete_messages_in_period(Period::Today).await?,
                ClearScope::Week => ctx.store.delete_messages_in_period(Period::Week).await?,
                ClearScope::Month => ctx.store.delete_messages_in_period(Period::Month).await?,
                ClearScope::Range { from, to } => {
                    let from = parse_time("--from", &from)?;
                    let to = parse_time("--to", &to)?;
                    ctx.store.delete_messages_by_time_range(from, to).await?
                }
            };
            Ok(format!("deleted {deleted} messages"))
        }
        Commands::Purge {
            messages,
            projects,
            tag,
        } => {
            let (removed, what) = match (messages, projects, tag) {
                (true, _, _) => (ctx.store.clear_messages().await?, "messages"),
                (false, true, Some(tag)) => (
                    ctx.store.clear_project_files_by_tag(&tag).await?,
                    "project files",
                ),
                (false, true, None) => (ctx.store.clear_project_files().await?, "project files"),
                (false, false, _) => (ctx.store.clear_all_memories().await?, "memories"),
            };
            Ok(format!("removed {removed} {what}"))
        }
        Commands::IndexProject { path, tag } => {
            let report = ctx
                .indexer
                .index_project(&path, tag.as_deref(), &ctx.cancel)
                .await?;
            Ok(render_report(&path, &report))
        }
        Commands::UpdateProject { path, tag } => {
            let report = ctx
                .indexer
                .update_project(&path, tag.as_deref(), &ctx.cancel)
                .await?;
            Ok(render_report(&path, &report))
        }
        Commands::WatchProject {
            path,
            interval,
            tag,
        } => {
            let interval = match interval {
                Some(0) => {
                    return Err(MnemoError::InvalidArgument(
                        "--interval must be at least 1 second".into(),
                    ));
                }
                Some(secs) => Duration::from_secs(secs),
                None => ctx.indexer.watch_interval(),
            };
            watch(ctx, &path, tag, interval).await
        }
        Commands::Serve { .. } | Commands::Status { .. } => Err(MnemoError::UnsupportedOperation(
            "not a one-shot memory command".into(),
        )),
    }
}

/// Poll `path` until the context's cancellation token fires.
async fn watch(
    ctx: &ToolContext,
    path: &Path,
    tag: Option<String>,
    interval: Duration,
) -> Result<String, MnemoError> {
    let is_dir = tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(MnemoError::InvalidArgument(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    let cycles = watch_project(
        ctx.indexer.clone(),
        path.to_path_buf(),
        tag,
        interval,
        ctx.cancel.clone(),
    )
    .await;
    Ok(format!("watch stopped after {cycles} passes"))
}

fn parse_role(value: &str) -> Result<Role, MnemoError> {
    match value.parse::<Role>() {
        Ok(Role::Project) | Err(_) => Err(MnemoError::InvalidArgument(format!(
            "invalid role `{value}`: expected one of user, assistant, system"
        ))),
        Ok(role) => Ok(role),
    }
}

fn parse_time(flag: &str, value: &str) -> Result<DateTime<Utc>, MnemoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| MnemoError::InvalidArgument(format!("invalid {flag} `{value}`: {e}")))
}

fn render_messages(messages: &[Message], empty: &str) -> String {
    if messages.is_empty() {
        return empty.to_string();
    }
    let mut out = String::new();
    for (i, m) in messages.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "[{}] {}: {}",
            m.timestamp.format("%Y-%m-%d %H:%M:%S"),
            m.role,
            m.content
        );
        if !m.tags.is_empty() {
            let _ = write!(out, "  #{}", m.tags.join(" #"));
        }
        if let Some(score) = m.score {
            let _ = write!(out, "  (score {score:.3})");
        }
    }
    out
}

fn render_report(path: &Path, report: &IndexReport) -> String {
    let mut out = format!(
        "{}: indexed {} (added {}, updated {}), unchanged {}, excluded {}, oversized {}, failed {}",
        path.display(),
        report.indexed(),
        report.added,
        report.updated,
        report.unchanged,
        report.excluded,
        report.oversized,
        report.failed
    );
    for failure in &report.failures {
        let _ = write!(out, "\n  {}: {}", failure.path, failure.error);
    }
    out
}
