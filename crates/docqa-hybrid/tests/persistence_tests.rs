use std::sync::Arc;

use tempfile::TempDir;

use docqa_core::config::LexicalScoring;
use docqa_core::error::Error;
use docqa_core::types::{Chunk, FileTypeMode};
use docqa_hybrid::{ChunkStore, FusionConfig, FusionRetriever};
use docqa_models::FakeEmbedder;
use docqa_vector::{load_generation, open_db, save_generation};

fn corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("p1", "water filters remove sediment").with_meta("page", 0i64),
        Chunk::new("p2", "rain barrels collect roof runoff").with_meta("page", 1i64),
        Chunk::new("p3", "boil water for one minute to disinfect").with_meta("page", 2i64),
    ]
}

#[tokio::test]
async fn restored_generation_answers_like_the_original() {
    let tmp = TempDir::new().unwrap();
    let uri = tmp.path().join("lancedb");
    let conn = open_db(uri.to_str().unwrap()).await.expect("open");

    let original = Arc::new(ChunkStore::new(Arc::new(FakeEmbedder::new(32)), LexicalScoring::TfIdf, 2));
    let built = original.replace_all(corpus(), FileTypeMode::Document).expect("ingest");
    save_generation(&conn, "manuals", &built.to_stored()).await.expect("save");

    let stored = load_generation(&conn, "manuals").await.expect("load").expect("present");
    let restored = Arc::new(ChunkStore::new(Arc::new(FakeEmbedder::new(32)), LexicalScoring::TfIdf, 2));
    let generation = restored.restore(stored).expect("restore");

    assert_eq!(generation.id(), built.id());
    assert_eq!(generation.mode(), Some(FileTypeMode::Document));
    assert_eq!(generation.fingerprint(), built.fingerprint());
    assert_eq!(generation.chunks(), built.chunks());
    let before = FusionRetriever::new(original, FusionConfig::default()).retrieve("boil water", 3).expect("before");
    let after = FusionRetriever::new(restored, FusionConfig::default()).retrieve("boil water", 3).expect("after");
    assert_eq!(before, after);
}

#[tokio::test]
async fn snapshot_from_another_embedder_is_refused() {
    let tmp = TempDir::new().unwrap();
    let uri = tmp.path().join("lancedb");
    let conn = open_db(uri.to_str().unwrap()).await.expect("open");
    let store = ChunkStore::new(Arc::new(FakeEmbedder::new(32)), LexicalScoring::TfIdf, 8);
    let built = store.replace_all(corpus(), FileTypeMode::Document).expect("ingest");
    save_generation(&conn, "manuals", &built.to_stored()).await.expect("save");
    let stored = load_generation(&conn, "manuals").await.expect("load").expect("present");

    let other = ChunkStore::new(Arc::new(FakeEmbedder::new(16)), LexicalScoring::TfIdf, 8);
    let before = other.current();
    let err = other.restore(stored).expect_err("mismatch");

    assert!(matches!(err, Error::IndexState(_)), "got {err}");
    assert!(Arc::ptr_eq(&before, &other.current()));
}

#[test]
fn tampered_snapshot_is_refused() {
    let store = ChunkStore::new(Arc::new(FakeEmbedder::new(32)), LexicalScoring::Bm25, 8);
    let mut stored = store.replace_all(corpus(), FileTypeMode::Document).expect("ingest").to_stored();
    stored.chunks[1].text = "edited after saving".to_string();

    let fresh = ChunkStore::new(Arc::new(FakeEmbedder::new(32)), LexicalScoring::Bm25, 8);
    let err = fresh.restore(stored).expect_err("fingerprint");

    assert!(matches!(err, Error::IndexState(_)));
    assert!(fresh.current().is_empty());
}
