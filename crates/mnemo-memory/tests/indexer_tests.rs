// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project indexer and watch loop behaviour against the in-memory backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use mnemo_config::IndexerConfig;
use mnemo_core::{
    AdapterType, EmbeddingAdapter, ErrorKind, HealthStatus, Message, MnemoError, PluginAdapter,
    ProjectFile, Role,
};
use mnemo_memory::{watch_project, HashEmbedder, ProjectIndexer};
use mnemo_test_utils::{StoreOp, TestHarness, TEST_COLLECTION};
use tokio_util::sync::CancellationToken;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Rewrite a file and push its mtime strictly past the previous one.
fn modify(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    let previous = std::fs::metadata(&path).unwrap().modified().unwrap();
    std::fs::write(&path, content).unwrap();
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(previous + Duration::from_secs(5)).unwrap();
}

fn set_mtime(root: &Path, rel: &str, mtime: SystemTime) {
    let file = std::fs::File::options()
        .write(true)
        .open(root.join(rel))
        .unwrap();
    file.set_modified(mtime).unwrap();
}

fn file_id(root: &Path, rel: &str) -> String {
    let absolute = root.canonicalize().unwrap().join(rel);
    ProjectFile::id_for_path(&absolute.display().to_string())
}

#[tokio::test]
async fn markdown_indexed_and_png_excluded_with_tag() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "notes.md", b"# Notes\n\nremember the milk");
    write(dir.path(), "diagram.png", &[0x89, b'P', b'N', b'G', 0x0d, 0x0a]);

    let report = h
        .indexer
        .index_project(dir.path(), Some("proj1"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.indexed(), 1);
    assert_eq!(report.excluded, 1);

    let point = h
        .vectors
        .point(TEST_COLLECTION, &file_id(dir.path(), "notes.md"))
        .await
        .unwrap();
    let file = ProjectFile::from_payload(&point.id, &point.payload).unwrap();
    assert_eq!(file.tag.as_deref(), Some("proj1"));
    assert_eq!(file.language, "markdown");
    assert_eq!(file.path, "notes.md");
}

#[tokio::test]
async fn second_pass_over_unchanged_tree_is_free() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/main.rs", b"fn main() {}");
    write(dir.path(), "src/lib.rs", b"pub fn lib() {}");
    write(dir.path(), "README.md", b"# readme");

    let cancel = CancellationToken::new();
    let first = h
        .indexer
        .index_project(dir.path(), None, &cancel)
        .await
        .unwrap();
    assert_eq!(first.added, 3);

    h.embedder.reset();
    h.vectors.clear_calls().await;

    let again = h
        .indexer
        .index_project(dir.path(), None, &cancel)
        .await
        .unwrap();
    assert_eq!((again.added, again.updated, again.unchanged), (0, 0, 3));

    let update = h
        .indexer
        .update_project(dir.path(), None, &cancel)
        .await
        .unwrap();
    assert_eq!((update.added, update.updated, update.unchanged), (0, 0, 3));

    assert_eq!(h.embedder.calls(), 0);
    assert_eq!(h.vectors.call_count(StoreOp::Upsert).await, 0);
}

#[tokio::test]
async fn modified_file_is_updated_in_place() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.txt", b"first draft");
    write(dir.path(), "b.txt", b"untouched");

    let cancel = CancellationToken::new();
    h.indexer
        .index_project(dir.path(), Some("v1"), &cancel)
        .await
        .unwrap();
    let id = file_id(dir.path(), "a.txt");
    let before = h.vectors.len(TEST_COLLECTION).await;

    modify(dir.path(), "a.txt", "second draft, much longer");
    h.embedder.reset();

    // The first-run pass only looks at unseen files.
    let initial = h
        .indexer
        .index_project(dir.path(), None, &cancel)
        .await
        .unwrap();
    assert_eq!(initial.indexed(), 0);

    let report = h
        .indexer
        .update_project(dir.path(), None, &cancel)
        .await
        .unwrap();
    assert_eq!((report.added, report.updated, report.unchanged), (0, 1, 1));
    assert_eq!(h.embedder.calls(), 1);
    assert_eq!(h.vectors.len(TEST_COLLECTION).await, before);

    let point = h.vectors.point(TEST_COLLECTION, &id).await.unwrap();
    let file = ProjectFile::from_payload(&point.id, &point.payload).unwrap();
    assert_eq!(file.id, id);
    assert_eq!(file.content, "second draft, much longer");
    // Stale files keep their tag when no new tag is given.
    assert_eq!(file.tag.as_deref(), Some("v1"));
}

#[tokio::test]
async fn edit_within_the_same_second_is_picked_up() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let second = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    write(dir.path(), "a.txt", b"saved once");
    set_mtime(dir.path(), "a.txt", second + Duration::from_millis(100));

    let cancel = CancellationToken::new();
    h.indexer
        .index_project(dir.path(), None, &cancel)
        .await
        .unwrap();

    write(dir.path(), "a.txt", b"saved twice");
    set_mtime(dir.path(), "a.txt", second + Duration::from_millis(700));
    let report = h
        .indexer
        .update_project(dir.path(), None, &cancel)
        .await
        .unwrap();
    assert_eq!((report.updated, report.unchanged), (1, 0));

    let point = h
        .vectors
        .point(TEST_COLLECTION, &file_id(dir.path(), "a.txt"))
        .await
        .unwrap();
    let file = ProjectFile::from_payload(&point.id, &point.payload).unwrap();
    assert_eq!(file.content, "saved twice");
    assert_eq!(file.mtime, 1_700_000_000_700);
}

#[tokio::test]
async fn empty_file_is_still_indexed() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "empty.rs", b"");

    let report = h
        .indexer
        .index_project(dir.path(), None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!((report.added, report.excluded, report.failed), (1, 0, 0));

    let point = h
        .vectors
        .point(TEST_COLLECTION, &file_id(dir.path(), "empty.rs"))
        .await
        .unwrap();
    let file = ProjectFile::from_payload(&point.id, &point.payload).unwrap();
    assert_eq!(file.content, "");
    assert_eq!(file.size_bytes, 0);
    assert_eq!(file.language, "rust");
}

/// Deletes a file the first time it embeds anything.
struct DeletingEmbedder {
    inner: HashEmbedder,
    victim: PathBuf,
}

#[async_trait]
impl PluginAdapter for DeletingEmbedder {
    fn name(&self) -> &str {
        "deleting"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for DeletingEmbedder {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        let _ = std::fs::remove_file(&self.victim);
        Ok(self.inner.embed_text(text))
    }
}

#[tokio::test]
async fn file_vanishing_mid_pass_is_a_partial_failure() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.txt", b"first");
    write(dir.path(), "b.txt", b"gone before it is read");
    write(dir.path(), "c.txt", b"last");

    // Files are visited in name order, so b.txt disappears after the walk
    // listed it and before it is read.
    let embedder = Arc::new(DeletingEmbedder {
        inner: HashEmbedder::new(h.embedder.dimensions()),
        victim: dir.path().join("b.txt"),
    });
    let indexer = ProjectIndexer::new(
        h.vectors.clone(),
        embedder,
        TEST_COLLECTION,
        &IndexerConfig::default(),
    );

    let report = indexer
        .index_project(dir.path(), None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!((report.added, report.failed), (2, 1));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "b.txt");
    assert!(matches!(
        report.partial_failure(),
        Some(MnemoError::PartialFailure {
            succeeded: 2,
            failed: 1
        })
    ));

    assert!(h.vectors.point(TEST_COLLECTION, &file_id(dir.path(), "a.txt")).await.is_some());
    assert!(h.vectors.point(TEST_COLLECTION, &file_id(dir.path(), "c.txt")).await.is_some());
    assert_eq!(h.store.stats().await.unwrap().project_files, 2);
}

#[tokio::test]
async fn oversized_files_are_skipped() {
    let indexer = IndexerConfig {
        max_file_bytes: 16,
        ..IndexerConfig::default()
    };
    let h = TestHarness::builder()
        .with_indexer_config(indexer)
        .build()
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "small.txt", b"tiny");
    write(dir.path(), "big.txt", &[b'x'; 64]);

    let report = h
        .indexer
        .index_project(dir.path(), None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.oversized, 1);
}

#[tokio::test]
async fn non_utf8_content_counts_as_excluded() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "data.bin.txt", &[0xff, 0xfe, 0x00, 0x80]);
    write(dir.path(), "ok.txt", b"fine");

    let report = h
        .indexer
        .index_project(dir.path(), None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.excluded, 1);
}

#[tokio::test]
async fn missing_root_is_invalid_argument() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let err = h
        .indexer
        .index_project(&dir.path().join("nope"), None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    write(dir.path(), "file.txt", b"x");
    let err = h
        .indexer
        .index_project(&dir.path().join("file.txt"), None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn cancelled_pass_writes_nothing_further() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.txt", b"a");
    write(dir.path(), "b.txt", b"b");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = h
        .indexer
        .index_project(dir.path(), None, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(h.embedder.calls(), 0);
    assert!(h.vectors.is_empty(TEST_COLLECTION).await);
}

#[tokio::test]
async fn embedding_failure_aborts_the_pass() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.txt", b"a");
    h.embedder.set_failing(true);

    let err = h
        .indexer
        .index_project(dir.path(), None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert_eq!(h.vectors.call_count(StoreOp::Upsert).await, 0);
}

#[tokio::test]
async fn clears_commute_and_equal_clear_all() {
    async fn populated(dir: &Path) -> TestHarness {
        let h = TestHarness::new().await.unwrap();
        h.store
            .add_message(Message::new(Role::User, "hello"))
            .await
            .unwrap();
        h.store
            .add_message(Message::new(Role::Assistant, "hi there"))
            .await
            .unwrap();
        h.indexer
            .index_project(dir, Some("proj1"), &CancellationToken::new())
            .await
            .unwrap();
        h
    }

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", b"# a");
    write(dir.path(), "b.rs", b"fn b() {}");

    let messages_first = populated(dir.path()).await;
    assert_eq!(messages_first.store.clear_messages().await.unwrap(), 2);
    assert_eq!(messages_first.store.clear_project_files().await.unwrap(), 2);

    let files_first = populated(dir.path()).await;
    assert_eq!(files_first.store.clear_project_files().await.unwrap(), 2);
    assert_eq!(files_first.store.clear_messages().await.unwrap(), 2);

    let all = populated(dir.path()).await;
    assert_eq!(all.store.clear_all_memories().await.unwrap(), 4);

    for h in [&messages_first, &files_first, &all] {
        assert!(h.vectors.is_empty(TEST_COLLECTION).await);
    }
}

#[tokio::test]
async fn clear_project_files_by_tag_keeps_other_tags() {
    let h = TestHarness::new().await.unwrap();
    let one = tempfile::tempdir().unwrap();
    let two = tempfile::tempdir().unwrap();
    write(one.path(), "a.md", b"a");
    write(two.path(), "b.md", b"b");
    let cancel = CancellationToken::new();
    h.indexer
        .index_project(one.path(), Some("one"), &cancel)
        .await
        .unwrap();
    h.indexer
        .index_project(two.path(), Some("two"), &cancel)
        .await
        .unwrap();

    assert_eq!(h.store.clear_project_files_by_tag("one").await.unwrap(), 1);
    assert_eq!(h.store.stats().await.unwrap().project_files, 1);
}

#[tokio::test]
async fn watch_picks_up_changes_and_stops_on_cancel() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.txt", b"a");

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch_project(
        Arc::clone(&h.indexer),
        dir.path().to_path_buf(),
        None,
        Duration::from_millis(20),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    write(dir.path(), "b.txt", b"b");
    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();

    let cycles = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(cycles >= 2, "only {cycles} cycles ran");
    assert_eq!(h.store.stats().await.unwrap().project_files, 2);
}

#[tokio::test]
async fn watch_survives_failing_cycles() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-yet");

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch_project(
        Arc::clone(&h.indexer),
        missing.clone(),
        None,
        Duration::from_millis(20),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    write(&missing, "late.txt", b"arrived late");
    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();

    let cycles = handle.await.unwrap();
    assert!(cycles >= 2);
    assert_eq!(h.store.stats().await.unwrap().project_files, 1);
}

#[test]
fn modify_moves_mtime_forward() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "f.txt", b"x");
    let before = std::fs::metadata(dir.path().join("f.txt"))
        .unwrap()
        .modified()
        .unwrap();
    modify(dir.path(), "f.txt", "y");
    let after = std::fs::metadata(dir.path().join("f.txt"))
        .unwrap()
        .modified()
        .unwrap();
    assert!(after.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs()
        > before.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs());
}
