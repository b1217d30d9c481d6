//! Standalone rewriting of follow-up questions.
//!
//! Follow-ups like "and its population?" only make sense next to earlier
//! turns. Before retrieval the question is rewritten against the (trimmed)
//! history so the search query is self-contained. The model is instructed to
//! rewrite, never answer.

use crate::providers::{CompletionProvider, ProviderError};
use crate::session::Turn;

const REWRITE_SYSTEM_PROMPT: &str = "You are a question rewriter. Given the \
chat history and the latest user question, rewrite the question so that it \
can be understood on its own, without the chat history. Resolve pronouns and \
references using the history. Do NOT answer the question. If it is already \
self-contained, return it unchanged.";

/// Rewrite `question` into a self-contained form using `history`.
///
/// Skipped entirely when the history is empty: a first question has nothing
/// to resolve against and the model call would be wasted. A provider failure
/// propagates; retrieving with an unresolved follow-up would silently fetch
/// the wrong context.
pub async fn rewrite_question(
    provider: &dyn CompletionProvider,
    history: &[Turn],
    question: &str,
) -> Result<String, ProviderError> {
    if history.is_empty() {
        return Ok(question.to_string());
    }

    let rewritten = provider
        .complete(Some(REWRITE_SYSTEM_PROMPT), history, question)
        .await?;

    let rewritten = rewritten.trim();
    if rewritten.is_empty() {
        // Degenerate model output; fall back to the literal question.
        Ok(question.to_string())
    } else {
        Ok(rewritten.to_string())
    }
}
