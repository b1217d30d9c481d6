//! Diversity-aware retrieval over the document store.
//!
//! Over-fetches `fetch_k` nearest candidates by vector distance, then
//! re-ranks them with maximal marginal relevance: iteratively pick the
//! candidate maximizing `lambda * relevance - (1 - lambda) * max similarity
//! to the already-selected set`.

use crate::errors::IndexResult;
use crate::models::RetrievedChunk;
use crate::store::{Candidate, DocumentStore};

/// Retrieval tuning parameters.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Number of chunks returned
    pub k: usize,
    /// Candidate over-fetch before MMR re-ranking
    pub fetch_k: usize,
    /// Relevance/diversity balance (1.0 = pure relevance)
    pub lambda: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            k: 3,
            fetch_k: 10,
            lambda: 0.4,
        }
    }
}

impl DocumentStore {
    /// Retrieve up to `params.k` chunks relevant to `query`.
    ///
    /// Returns an empty sequence (not an error) when the store is empty.
    /// Deterministic for a fixed store state and query: candidates arrive in
    /// distance order and MMR ties resolve to the earlier candidate.
    pub async fn search(&self, query: &str, params: SearchParams) -> IndexResult<Vec<RetrievedChunk>> {
        let embeddings = self.embedder().embed_batch(&[query.to_string()]).await?;
        let Some(query_vec) = embeddings.first() else {
            return Ok(Vec::new());
        };

        let candidates = self
            .nearest(query_vec, params.fetch_k.max(params.k))
            .await?;

        Ok(mmr_rerank(query_vec, candidates, params.k, params.lambda))
    }
}

/// Select `k` candidates balancing relevance against redundancy.
pub(crate) fn mmr_rerank(
    query: &[f32],
    candidates: Vec<Candidate>,
    k: usize,
    lambda: f32,
) -> Vec<RetrievedChunk> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, &c.embedding))
        .collect();

    let mut selected: Vec<usize> = Vec::new();
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (pos, &idx) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&s| cosine_similarity(&candidates[idx].embedding, &candidates[s].embedding))
                .fold(f32::NEG_INFINITY, f32::max);

            let score = if selected.is_empty() {
                relevance[idx]
            } else {
                lambda * relevance[idx] - (1.0 - lambda) * redundancy
            };

            // Strict comparison: ties resolve to the earlier (closer) candidate.
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        selected.push(remaining.remove(best_pos));
    }

    selected
        .into_iter()
        .map(|idx| {
            let c = &candidates[idx];
            RetrievedChunk {
                id: c.id.clone(),
                source: c.source.clone(),
                chunk_index: c.chunk_index,
                content: c.content.clone(),
                score: relevance[idx],
            }
        })
        .collect()
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, embedding: Vec<f32>) -> Candidate {
        Candidate {
            id: id.to_string(),
            source: "test.md".to_string(),
            chunk_index: 0,
            content: format!("content {id}"),
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_mmr_empty_candidates() {
        let result = mmr_rerank(&[1.0, 0.0], Vec::new(), 3, 0.4);
        assert!(result.is_empty());
    }

    #[test]
    fn test_mmr_first_pick_is_most_relevant() {
        let candidates = vec![
            candidate("a", vec![0.9, 0.1]),
            candidate("b", vec![1.0, 0.0]),
            candidate("c", vec![0.0, 1.0]),
        ];

        let result = mmr_rerank(&[1.0, 0.0], candidates, 1, 0.4);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "b");
    }

    #[test]
    fn test_mmr_prefers_diverse_second_pick() {
        // "b" is a near-duplicate of "a"; "c" is less relevant but diverse.
        // With lambda = 0.4 diversity outweighs the relevance gap.
        let candidates = vec![
            candidate("a", vec![1.0, 0.0, 0.0]),
            candidate("b", vec![0.99, 0.01, 0.0]),
            candidate("c", vec![0.5, 0.0, 0.8]),
        ];

        let result = mmr_rerank(&[1.0, 0.0, 0.0], candidates, 2, 0.4);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "a");
        assert_eq!(result[1].id, "c");
    }

    #[test]
    fn test_mmr_pure_relevance_at_lambda_one() {
        let candidates = vec![
            candidate("a", vec![1.0, 0.0]),
            candidate("b", vec![0.99, 0.01]),
            candidate("c", vec![0.0, 1.0]),
        ];

        let result = mmr_rerank(&[1.0, 0.0], candidates, 2, 1.0);
        assert_eq!(result[0].id, "a");
        assert_eq!(result[1].id, "b");
    }

    #[test]
    fn test_mmr_bounded_by_candidate_count() {
        let candidates = vec![candidate("a", vec![1.0, 0.0])];
        let result = mmr_rerank(&[1.0, 0.0], candidates, 5, 0.4);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_mmr_deterministic_on_ties() {
        // Identical candidates: the earlier one wins.
        let candidates = vec![
            candidate("first", vec![1.0, 0.0]),
            candidate("second", vec![1.0, 0.0]),
        ];

        let result = mmr_rerank(&[1.0, 0.0], candidates, 1, 0.4);
        assert_eq!(result[0].id, "first");
    }

    #[test]
    fn test_mmr_score_is_query_relevance() {
        let candidates = vec![candidate("a", vec![1.0, 0.0])];
        let result = mmr_rerank(&[1.0, 0.0], candidates, 1, 0.4);
        assert!((result[0].score - 1.0).abs() < 1e-6);
    }
}
