//! Chat-completions providers.

pub mod openai_compatible;
pub mod provider;

pub use openai_compatible::OpenAiCompatibleClient;
pub use provider::{CompletionProvider, ProviderError};
