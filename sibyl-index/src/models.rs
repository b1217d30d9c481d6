use serde::{Deserialize, Serialize};

/// A chunk ready to be added to the document store.
///
/// Produced by the ingestion path (see [`crate::chunker`]); the store assigns
/// the id and embedding on insert.
#[derive(Debug, Clone)]
pub struct NewChunk {
    /// Origin of the chunk (typically the uploaded file name)
    pub source: String,
    /// Position of the chunk within its source document
    pub chunk_index: i64,
    /// Raw text content
    pub content: String,
}

/// A chunk returned from a retrieval query, in rank order.
///
/// Ephemeral: owned by the request that produced it and surfaced to the
/// caller for transparency about what grounded the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Stable chunk identifier
    pub id: String,
    /// Origin of the chunk
    pub source: String,
    /// Position of the chunk within its source document
    pub chunk_index: i64,
    /// Raw text content
    pub content: String,
    /// Relevance to the query (cosine similarity)
    pub score: f32,
}
