// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mnemo - conversation memory engine backed by a vector database.
#[derive(Parser, Debug)]
#[command(name = "mnemo", version, about, long_about = None)]
pub struct Cli {
    /// Load this TOML file instead of the standard config locations.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the memory server (HTTP by default).
    Serve {
        /// Speak line-delimited JSON tool calls on stdin/stdout instead of HTTP.
        #[arg(long)]
        stdio: bool,
    },
    /// Store a conversational message.
    Add {
        /// user, assistant, or system.
        role: String,
        content: String,
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Similarity search over stored messages and project files.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Delete messages from the current day, week, month, or an explicit range.
    Clear {
        #[command(subcommand)]
        scope: ClearScope,
    },
    /// Remove stored memories wholesale. With no flag, removes everything.
    Purge {
        /// Only conversational messages.
        #[arg(long, conflicts_with = "projects")]
        messages: bool,
        /// Only indexed project files.
        #[arg(long)]
        projects: bool,
        /// With --projects, only files indexed under this tag.
        #[arg(long, requires = "projects")]
        tag: Option<String>,
    },
    /// Index every file under a directory.
    IndexProject {
        path: PathBuf,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Re-index new and modified files under a directory.
    UpdateProject {
        path: PathBuf,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Keep a directory indexed until interrupted.
    WatchProject {
        path: PathBuf,
        /// Seconds between passes (defaults to indexer.watch_interval_secs).
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Show recent messages, newest first.
    History {
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        role: Option<String>,
        /// Only messages carrying every given tag.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Check whether a server is running.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
}

/// Time scopes for `mnemo clear`.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ClearScope {
    Today,
    Week,
    Month,
    /// Inclusive RFC 3339 range.
    Range {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("mnemo").chain(args.iter().copied()))
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn add_collects_repeated_tags() {
        let cli = parse(&["add", "user", "hello", "--tag", "a", "--tag", "b"]).unwrap();
        match cli.command {
            Commands::Add { role, content, tags } => {
                assert_eq!(role, "user");
                assert_eq!(content, "hello");
                assert_eq!(tags, vec!["a", "b"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clear_range_requires_both_bounds() {
        assert!(parse(&["clear", "range", "--from", "2026-01-01T00:00:00Z"]).is_err());
        let cli = parse(&[
            "clear",
            "range",
            "--from",
            "2026-01-01T00:00:00Z",
            "--to",
            "2026-01-02T00:00:00Z",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Clear { scope: ClearScope::Range { .. } }
        ));
        assert!(matches!(
            parse(&["clear", "week"]).unwrap().command,
            Commands::Clear { scope: ClearScope::Week }
        ));
    }

    #[test]
    fn purge_flags() {
        assert!(parse(&["purge", "--messages", "--projects"]).is_err());
        assert!(parse(&["purge", "--tag", "proj1"]).is_err());
        assert!(parse(&["purge", "--projects", "--tag", "proj1"]).is_ok());
        assert!(parse(&["purge"]).is_ok());
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = parse(&["serve", "--stdio", "--config", "/tmp/m.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/m.toml")));
        assert!(matches!(cli.command, Commands::Serve { stdio: true }));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(parse(&[]).is_err());
    }
}
