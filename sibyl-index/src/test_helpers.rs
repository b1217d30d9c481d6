//! Test helpers for the document store.

use std::path::Path;
use std::sync::Arc;

use crate::embeddings::Embedder;
use crate::errors::IndexResult;
use crate::store::DocumentStore;

/// Embedding dimension used by test stores.
pub const TEST_EMBEDDING_DIM: usize = 32;

/// Deterministic in-process embedder for tests.
///
/// Hashes each token into a fixed-size bag-of-words vector, so texts that
/// share vocabulary get high cosine similarity without a live embedding
/// server.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_one(&self, input: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0f32; self.dim];
        for token in input
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dim;
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait::async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|input| self.embed_one(input)).collect())
    }
}

/// Open a document store backed by a scratch database and the hash embedder.
pub async fn open_test_store(db_path: &Path) -> IndexResult<DocumentStore> {
    let embedder = Arc::new(HashEmbedder::new(TEST_EMBEDDING_DIM));
    DocumentStore::open(db_path, embedder, TEST_EMBEDDING_DIM).await
}
