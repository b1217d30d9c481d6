//! HTTP gateway for the sibyl retrieval-augmented chat service.
//!
//! Wires the document index and a chat-completions provider into a
//! per-session pipeline: trim history, rewrite the question, retrieve
//! context, generate an answer, record the exchange.

pub mod chat;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod session;
pub mod state;

pub use pipeline::{ChatOutcome, PipelineError, RagPipeline};
pub use providers::{CompletionProvider, ProviderError};
pub use session::{SessionStore, Turn, TurnRole};
