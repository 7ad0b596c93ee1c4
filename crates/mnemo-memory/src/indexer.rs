// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental project file indexer.
//!
//! Each file found under the project root is classified against the state
//! stored in the vector backend:
//!
//! - **Unseen**: no stored point. Read, embed, upsert (counts as added).
//! - **Stale**: stored mtime is strictly older than the file's. Re-read,
//!   re-embed, upsert over the same path-derived ID (counts as updated).
//! - **Fresh**: mtime unchanged. Skipped before any embedding or network call.
//!
//! Hidden directories, configured ignored directories, media/binary
//! extensions, oversized files, and non-UTF-8 files are never indexed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use mnemo_config::IndexerConfig;
use mnemo_core::types::fields;
use mnemo_core::{
    Condition, EmbeddingAdapter, Filter, IndexReport, MnemoError, Point, ProjectFile, Role,
    VectorStore,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::language;

/// Which freshness states a pass acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// First run: only Unseen files are written.
    Initial,
    /// Unseen and Stale files are written.
    Update,
}

/// Previously indexed state of one file.
#[derive(Debug, Clone)]
struct StoredFile {
    mtime: i64,
    tag: Option<String>,
}

/// A regular file found during traversal.
#[derive(Debug)]
struct Candidate {
    absolute: PathBuf,
    relative: String,
    size: u64,
    mtime: i64,
}

#[derive(Debug, Default)]
struct Walk {
    candidates: Vec<Candidate>,
    excluded: usize,
    errors: Vec<(String, String)>,
}

/// Walks a project tree and keeps its files in sync with the vector backend.
pub struct ProjectIndexer {
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingAdapter>,
    collection: String,
    max_file_bytes: u64,
    ignored_dirs: Vec<String>,
    watch_interval: Duration,
}

impl ProjectIndexer {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingAdapter>,
        collection: impl Into<String>,
        config: &IndexerConfig,
    ) -> Self {
        Self {
            vectors,
            embedder,
            collection: collection.into(),
            max_file_bytes: config.max_file_bytes,
            ignored_dirs: config.ignored_dirs.clone(),
            watch_interval: config.watch_interval(),
        }
    }

    /// Default polling interval for [`crate::watch_project`].
    pub fn watch_interval(&self) -> Duration {
        self.watch_interval
    }

    /// First-run pass: index every Unseen file under `root`.
    pub async fn index_project(
        &self,
        root: &Path,
        tag: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, MnemoError> {
        self.run(root, tag, Pass::Initial, cancel).await
    }

    /// Incremental pass: index Unseen files and re-index Stale ones.
    pub async fn update_project(
        &self,
        root: &Path,
        tag: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, MnemoError> {
        self.run(root, tag, Pass::Update, cancel).await
    }

    async fn run(
        &self,
        root: &Path,
        tag: Option<&str>,
        pass: Pass,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, MnemoError> {
        let root = resolve_root(root).await?;
        let root_str = root.display().to_string();

        let walk = {
            let root = root.clone();
            let ignored = self.ignored_dirs.clone();
            tokio::task::spawn_blocking(move || walk_tree(&root, &ignored))
                .await
                .map_err(|e| MnemoError::Internal(format!("directory walk panicked: {e}")))?
        };
        let stored = self.load_stored(&root_str).await?;
        debug!(
            root = %root_str,
            candidates = walk.candidates.len(),
            stored = stored.len(),
            "loaded project state"
        );

        let mut report = IndexReport {
            excluded: walk.excluded,
            ..IndexReport::default()
        };
        for (path, error) in walk.errors {
            warn!(path = %path, error = %error, "failed to read directory entry");
            report.record_failure(path, error);
        }

        for candidate in walk.candidates {
            if cancel.is_cancelled() {
                info!(root = %root_str, written = report.indexed(), "indexing cancelled");
                return Err(MnemoError::Cancelled);
            }

            if candidate.size > self.max_file_bytes {
                warn!(
                    path = %candidate.relative,
                    size = candidate.size,
                    max = self.max_file_bytes,
                    "skipping oversized file"
                );
                report.oversized += 1;
                continue;
            }

            let previous = stored.get(&candidate.relative);
            let is_update = match previous {
                None => false,
                Some(prev) if pass == Pass::Update && candidate.mtime > prev.mtime => true,
                Some(_) => {
                    report.unchanged += 1;
                    continue;
                }
            };

            let bytes = match tokio::fs::read(&candidate.absolute).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %candidate.relative, error = %e, "failed to read file");
                    report.record_failure(&candidate.relative, e);
                    continue;
                }
            };
            let Ok(content) = String::from_utf8(bytes) else {
                debug!(path = %candidate.relative, "skipping non-UTF-8 file");
                report.excluded += 1;
                continue;
            };

            let file_tag = tag
                .map(str::to_string)
                .or_else(|| previous.and_then(|p| p.tag.clone()));
            let file = ProjectFile {
                id: ProjectFile::id_for_path(&candidate.absolute.display().to_string()),
                path: candidate.relative.clone(),
                project_root: root_str.clone(),
                language: language::language_for(&candidate.absolute).to_string(),
                mtime: candidate.mtime,
                tag: file_tag,
                indexed_at: Utc::now(),
                size_bytes: content.len() as u64,
                content,
            };
            self.write(file).await?;

            if is_update {
                report.updated += 1;
            } else {
                report.added += 1;
            }
        }

        info!(
            root = %root_str,
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            excluded = report.excluded,
            oversized = report.oversized,
            failed = report.failed,
            "project indexing complete"
        );
        if let Some(err) = report.partial_failure() {
            warn!(error = %err, "some project files could not be indexed");
        }
        Ok(report)
    }

    /// Embed and upsert one file. The embedding always precedes the write.
    async fn write(&self, file: ProjectFile) -> Result<(), MnemoError> {
        let vector = self.embedder.embed(&file.content).await?;
        let point = Point {
            id: file.id.clone(),
            vector,
            payload: file.to_payload(),
        };
        self.vectors.upsert(&self.collection, vec![point]).await
    }

    /// One scroll over this root's project points, keyed by relative path.
    async fn load_stored(&self, root: &str) -> Result<HashMap<String, StoredFile>, MnemoError> {
        let filter = Filter::new()
            .must(Condition::eq(fields::ROLE, Role::Project.as_str()))
            .must(Condition::eq(fields::PROJECT_ROOT, root));
        let points = self
            .vectors
            .scroll(
                &self.collection,
                Some(&filter),
                usize::MAX,
                Some(&[fields::PATH, fields::MTIME, fields::TAG]),
            )
            .await?;

        Ok(points
            .into_iter()
            .filter_map(|point| {
                let path = point.payload.get(fields::PATH)?.as_str()?.to_string();
                let mtime = point
                    .payload
                    .get(fields::MTIME)
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                let tag = point
                    .payload
                    .get(fields::TAG)
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some((path, StoredFile { mtime, tag }))
            })
            .collect())
    }
}

async fn resolve_root(root: &Path) -> Result<PathBuf, MnemoError> {
    let resolved = tokio::fs::canonicalize(root).await.map_err(|e| {
        MnemoError::InvalidArgument(format!("cannot open project path {}: {e}", root.display()))
    })?;
    if !resolved.is_dir() {
        return Err(MnemoError::InvalidArgument(format!(
            "project path {} is not a directory",
            root.display()
        )));
    }
    Ok(resolved)
}

/// Collect indexable files, pruning hidden and ignored directories.
fn walk_tree(root: &Path, ignored_dirs: &[String]) -> Walk {
    let mut walk = Walk::default();
    let entries = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && !ignored_dirs.iter().any(|d| *d == name)
        });

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                walk.errors.push((path, e.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if language::is_excluded(path) {
            walk.excluded += 1;
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                walk.errors.push((path.display().to_string(), e.to_string()));
                continue;
            }
        };
        walk.candidates.push(Candidate {
            absolute: path.to_path_buf(),
            relative: relative_path(root, path),
            size: metadata.len(),
            mtime: unix_millis(metadata.modified().ok()),
        });
    }
    walk
}

/// `/`-separated path of `path` relative to `root`.
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Saves within the same second must still compare as newer.
fn unix_millis(time: Option<SystemTime>) -> i64 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_skips_hidden_ignored_and_media() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(root.join("README.md"), "# readme").unwrap();
        std::fs::write(root.join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        std::fs::write(root.join(".git/config"), "[core]").unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();

        let walk = walk_tree(root, &["node_modules".to_string()]);
        let paths: Vec<&str> = walk.candidates.iter().map(|c| c.relative.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/main.rs"]);
        assert_eq!(walk.excluded, 1);
        assert!(walk.errors.is_empty());
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new("/project");
        assert_eq!(relative_path(root, Path::new("/project/a/b/c.rs")), "a/b/c.rs");
    }

    #[test]
    fn mtime_keeps_milliseconds() {
        assert_eq!(unix_millis(None), 0);
        assert_eq!(unix_millis(Some(UNIX_EPOCH + Duration::from_secs(42))), 42_000);
        assert_eq!(unix_millis(Some(UNIX_EPOCH + Duration::from_millis(1_700_000_000_700))), 1_700_000_000_700);
    }
}
