//! The chat pipeline: trim, rewrite, retrieve, generate, record.

use std::sync::Arc;

use sibyl_index::{DocumentStore, IndexError, RetrievedChunk, SearchParams};
use tracing::debug;

use crate::chat::{
    HeuristicTokenCounter, TokenCounter, generate_answer, rewrite_question, trim_history,
};
use crate::providers::{CompletionProvider, ProviderError};
use crate::session::SessionStore;

/// Errors from a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("model call failed: {0}")]
    Model(#[from] ProviderError),
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
}

/// Result of a successful chat request.
#[derive(Debug)]
pub struct ChatOutcome {
    pub answer: String,
    pub context: Vec<RetrievedChunk>,
}

/// Orchestrates one chat request per call.
///
/// Stage order is fixed: snapshot and trim the session history, rewrite the
/// question into standalone form, retrieve context, generate the answer, and
/// only then append the exchange. Any stage failing aborts the run with the
/// transcript untouched.
pub struct RagPipeline {
    provider: Arc<dyn CompletionProvider>,
    store: DocumentStore,
    sessions: Arc<SessionStore>,
    counter: Arc<dyn TokenCounter>,
    trim_max_tokens: u32,
    search: SearchParams,
}

impl RagPipeline {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: DocumentStore,
        sessions: Arc<SessionStore>,
        trim_max_tokens: u32,
        search: SearchParams,
    ) -> Self {
        Self {
            provider,
            store,
            sessions,
            counter: Arc::new(HeuristicTokenCounter),
            trim_max_tokens,
            search,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Run one question through the full pipeline.
    pub async fn chat(
        &self,
        session_id: &str,
        question: &str,
    ) -> Result<ChatOutcome, PipelineError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(PipelineError::InvalidRequest("session_id must not be empty"));
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::InvalidRequest("question must not be empty"));
        }

        let transcript = self.sessions.get_or_create(session_id);
        let history = trim_history(&transcript, self.trim_max_tokens, self.counter.as_ref());
        if history.len() < transcript.len() {
            debug!(
                session_id,
                dropped = transcript.len() - history.len(),
                "trimmed oldest turns to fit the token budget"
            );
        }

        let query = rewrite_question(self.provider.as_ref(), &history, question).await?;
        if query != question {
            debug!(session_id, %query, "rewrote follow-up question for retrieval");
        }

        let context = self.store.search(&query, self.search).await?;
        debug!(session_id, retrieved = context.len(), "retrieved context");

        let answer = generate_answer(self.provider.as_ref(), &history, question, &context).await?;

        // Both turns land together; a failure above leaves the transcript
        // exactly as it was.
        self.sessions.append_exchange(session_id, question, &answer);

        Ok(ChatOutcome { answer, context })
    }

    /// Forget everything about a session. Unknown ids are a no-op.
    pub fn reset_session(&self, session_id: &str) {
        self.sessions.clear(session_id);
    }
}
