//! Provider trait for abstracting chat-completions backends.

use crate::session::Turn;

/// Provider error types
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("No content in response")]
    NoContent,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

/// A backend that can turn a system prompt, conversation history, and a new
/// user message into a single text completion.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Current model
    fn model(&self) -> &str;

    /// Run one completion and return the assistant text.
    async fn complete(
        &self,
        system: Option<&str>,
        history: &[Turn],
        new_message: &str,
    ) -> Result<String, ProviderError>;
}
