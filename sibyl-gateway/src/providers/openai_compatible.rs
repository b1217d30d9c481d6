//! OpenAI-compatible Chat Completions client.
//!
//! Works against any endpoint speaking the `/v1/chat/completions` dialect
//! (Groq, OpenRouter, llama.cpp server, vLLM).

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::providers::provider::{CompletionProvider, ProviderError};
use crate::session::{Turn, TurnRole};

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// OpenAI-compatible API client.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    provider_name: String,
    max_tokens: u32,
}

/// Request body for the Chat Completions API
#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
}

/// OpenAI-compatible message format
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: Option<String>,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: OpenAiMessage,
}

impl OpenAiCompatibleClient {
    /// Create a new OpenAI-compatible client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        provider_name: impl Into<String>,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            api_key,
            model: model.into(),
            base_url: base_url.into(),
            provider_name: provider_name.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the completion token cap sent with every request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build request headers with optional bearer auth.
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &self.api_key {
            let auth_value = format!("Bearer {}", api_key);
            if let Ok(header_value) = HeaderValue::from_str(&auth_value) {
                headers.insert(AUTHORIZATION, header_value);
            }
        }

        headers
    }

    fn chat_completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Convert the system prompt, history, and new message to wire messages.
    fn build_messages(
        &self,
        system: Option<&str>,
        history: &[Turn],
        new_message: &str,
    ) -> Vec<OpenAiMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);

        if let Some(system) = system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(system.to_string()),
            });
        }

        for turn in history {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            };
            messages.push(OpenAiMessage {
                role: role.to_string(),
                content: Some(turn.content.clone()),
            });
        }

        messages.push(OpenAiMessage {
            role: "user".to_string(),
            content: Some(new_message.to_string()),
        });

        messages
    }
}

/// Truncate `text` to at most `max` bytes on a char boundary.
fn body_preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system: Option<&str>,
        history: &[Turn],
        new_message: &str,
    ) -> Result<String, ProviderError> {
        let request_body = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: self.build_messages(system, history, new_message),
            max_tokens: self.max_tokens,
        };

        let response = self
            .http_client
            .post(self.chat_completions_url())
            .headers(self.build_headers())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let response_text = response.text().await?;
        let completions: ChatCompletionsResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                let preview = body_preview(&response_text, 500);
                ProviderError::InvalidFormat(format!(
                    "Failed to parse chat completions response: {e}\nBody preview: {preview}"
                ))
            })?;

        completions
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::NoContent)
    }
}
