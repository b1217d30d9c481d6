use serde::Deserialize;

use crate::errors::{IndexError, IndexResult};

/// Embedding capability used by the document store.
///
/// The production implementation is [`HttpEmbeddingClient`]; tests substitute
/// a deterministic in-process embedder.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, inputs: &[String]) -> IndexResult<Vec<Vec<f32>>>;
}

/// Client for an Ollama-style `/api/embed` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl HttpEmbeddingClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for HttpEmbeddingClient {
    async fn embed_batch(&self, inputs: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let body = EmbedRequest {
            model: self.model.clone(),
            input: inputs.to_vec(),
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IndexError::Embedding(format!(
                "embedding request failed: {status} {text}"
            )));
        }

        let payload: EmbedResponse = response.json().await?;

        if let Some(embeddings) = payload.embeddings {
            return Ok(embeddings);
        }

        if let Some(embedding) = payload.embedding {
            return Ok(vec![embedding]);
        }

        Err(IndexError::Embedding(
            "embedding response missing vectors".to_string(),
        ))
    }
}

#[derive(Debug, Clone, serde::Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbedResponse {
    embeddings: Option<Vec<Vec<f32>>>,
    embedding: Option<Vec<f32>>,
}
