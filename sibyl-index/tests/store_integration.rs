//! Integration tests for the document store against a scratch SQLite file.

use std::sync::Arc;

use sibyl_index::chunker::split_document;
use sibyl_index::test_helpers::{HashEmbedder, TEST_EMBEDDING_DIM, open_test_store};
use sibyl_index::{DocumentStore, Embedder, IndexError, IndexResult, NewChunk, SearchParams};

fn chunk(source: &str, index: i64, content: &str) -> NewChunk {
    NewChunk {
        source: source.to_string(),
        chunk_index: index,
        content: content.to_string(),
    }
}

#[tokio::test]
async fn add_and_count_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_test_store(&dir.path().join("index.db")).await.unwrap();

    assert_eq!(store.count().await, 0);

    let added = store
        .add(&[
            chunk("facts.md", 0, "Paris is the capital of France."),
            chunk("facts.md", 1, "Berlin is the capital of Germany."),
        ])
        .await
        .unwrap();

    assert_eq!(added, 2);
    assert_eq!(store.count().await, 2);
}

#[tokio::test]
async fn add_empty_batch_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_test_store(&dir.path().join("index.db")).await.unwrap();

    let added = store.add(&[]).await.unwrap();
    assert_eq!(added, 0);
    assert_eq!(store.count().await, 0);
}

#[tokio::test]
async fn reindexing_identical_chunks_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_test_store(&dir.path().join("index.db")).await.unwrap();

    let batch = [
        chunk("facts.md", 0, "Paris is the capital of France."),
        chunk("facts.md", 1, "Berlin is the capital of Germany."),
    ];

    assert_eq!(store.add(&batch).await.unwrap(), 2);
    // Re-uploading the same document adds nothing.
    assert_eq!(store.add(&batch).await.unwrap(), 0);
    assert_eq!(store.count().await, 2);

    // Changed content is indexed as a new chunk.
    let edited = [chunk("facts.md", 1, "Berlin is the capital of Germany, on the Spree.")];
    assert_eq!(store.add(&edited).await.unwrap(), 1);
    assert_eq!(store.count().await, 3);
}

/// Embedder that returns a wrong-dimension vector for every input after the
/// first, to force a mid-batch failure.
struct UnevenEmbedder {
    inner: HashEmbedder,
}

#[async_trait::async_trait]
impl Embedder for UnevenEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        let mut vectors = self.inner.embed_batch(inputs).await?;
        for vector in vectors.iter_mut().skip(1) {
            vector.truncate(8);
        }
        Ok(vectors)
    }
}

#[tokio::test]
async fn failed_batch_leaves_store_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(UnevenEmbedder {
        inner: HashEmbedder::new(TEST_EMBEDDING_DIM),
    });
    let store = DocumentStore::open(&dir.path().join("index.db"), embedder, TEST_EMBEDDING_DIM)
        .await
        .unwrap();

    let err = store
        .add(&[
            chunk("facts.md", 0, "Paris is the capital of France."),
            chunk("facts.md", 1, "Berlin is the capital of Germany."),
        ])
        .await
        .expect_err("second vector has the wrong dimension");
    assert!(matches!(err, IndexError::EmbeddingDimMismatch { .. }));

    // Nothing from the batch was committed, including the valid first chunk.
    assert_eq!(store.count().await, 0);
    let results = store
        .search("capital of France", SearchParams::default())
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn search_empty_store_returns_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_test_store(&dir.path().join("index.db")).await.unwrap();

    let results = store
        .search("anything at all", SearchParams::default())
        .await
        .unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn search_finds_relevant_chunk_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_test_store(&dir.path().join("index.db")).await.unwrap();

    store
        .add(&[
            chunk("facts.md", 0, "Paris is the capital of France."),
            chunk("facts.md", 1, "Rust has a strong type system and ownership."),
            chunk("facts.md", 2, "The Pacific is the largest ocean on Earth."),
        ])
        .await
        .unwrap();

    let results = store
        .search("What is the capital of France?", SearchParams::default())
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results[0].content.contains("Paris"));
    assert_eq!(results[0].source, "facts.md");
    assert!(results.len() <= 3);
}

#[tokio::test]
async fn search_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_test_store(&dir.path().join("index.db")).await.unwrap();

    store
        .add(&[
            chunk("a.md", 0, "France borders Spain and Italy."),
            chunk("b.md", 0, "The capital of France is Paris."),
            chunk("c.md", 0, "Paris hosts the Louvre museum."),
            chunk("d.md", 0, "Spain has a Mediterranean coastline."),
        ])
        .await
        .unwrap();

    let first = store
        .search("capital of France", SearchParams::default())
        .await
        .unwrap();
    let second = store
        .search("capital of France", SearchParams::default())
        .await
        .unwrap();

    let ids = |results: &[sibyl_index::RetrievedChunk]| {
        results.iter().map(|r| r.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
}

#[tokio::test]
async fn reset_clears_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_test_store(&dir.path().join("index.db")).await.unwrap();

    store
        .add(&[chunk("facts.md", 0, "Paris is the capital of France.")])
        .await
        .unwrap();
    assert_eq!(store.count().await, 1);

    store.reset().await.unwrap();
    assert_eq!(store.count().await, 0);

    let results = store
        .search("Paris", SearchParams::default())
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn split_and_index_a_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_test_store(&dir.path().join("index.db")).await.unwrap();

    let text = format!(
        "{}\n\n{}",
        "Paris is the capital of France. ".repeat(10),
        "Madrid is the capital of Spain. ".repeat(10)
    );
    let chunks = split_document("capitals.txt", &text, 200, 20);
    assert!(chunks.len() > 1);

    store.add(&chunks).await.unwrap();
    assert_eq!(store.count().await, chunks.len() as i64);

    let results = store
        .search("capital of Spain", SearchParams::default())
        .await
        .unwrap();
    assert!(results.iter().any(|r| r.content.contains("Madrid")));
}
