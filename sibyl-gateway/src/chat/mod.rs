//! Chat pipeline stages: history trimming, question rewriting, answer
//! generation.

pub mod contextualize;
pub mod generate;
pub mod trim;

pub use contextualize::rewrite_question;
pub use generate::{UNKNOWN_ANSWER, generate_answer};
pub use trim::{HeuristicTokenCounter, TokenCounter, trim_history};
