//! Document indexing and retrieval for sibyl.
//!
//! Chunks of ingested documents are persisted in SQLite with their embedding
//! vectors (sqlite-vec) and retrieved with diversity-aware MMR ranking.

pub mod chunker;
pub mod embeddings;
pub mod errors;
pub mod models;
pub mod paths;
pub mod search;
pub mod store;

// Re-export test helpers when running tests or when the feature is enabled
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use embeddings::{Embedder, HttpEmbeddingClient};
pub use errors::{IndexError, IndexResult};
pub use models::{NewChunk, RetrievedChunk};
pub use search::SearchParams;
pub use store::DocumentStore;
