//! Grounded answer generation.

use sibyl_index::RetrievedChunk;

use crate::providers::{CompletionProvider, ProviderError};
use crate::session::Turn;

/// Answer returned without a model call when retrieval finds nothing.
pub const UNKNOWN_ANSWER: &str = "I don't know. The indexed documents do not \
contain information relevant to this question.";

const ANSWER_SYSTEM_PROMPT: &str = "You are an assistant for \
question-answering tasks. Use only the following pieces of retrieved context \
to answer the question. If you cannot answer from the retrieved context, say \
that you don't know. Use three to five sentences maximum and keep the answer \
concise.";

/// Answer `question` grounded in `chunks`, carrying `history` for
/// conversational tone.
///
/// With no retrieved context the model is not called at all; answering from
/// parametric memory is exactly what grounding is meant to prevent.
pub async fn generate_answer(
    provider: &dyn CompletionProvider,
    history: &[Turn],
    question: &str,
    chunks: &[RetrievedChunk],
) -> Result<String, ProviderError> {
    if chunks.is_empty() {
        return Ok(UNKNOWN_ANSWER.to_string());
    }

    let context = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let system = format!("{ANSWER_SYSTEM_PROMPT}\n\nContext:\n{context}");

    provider.complete(Some(&system), history, question).await
}
