//! Token-budgeted history trimming.
//!
//! Keeps the newest turns whose combined estimate fits the budget, dropping
//! from the oldest end. Counting is an estimate, not provider-exact; the
//! heuristic overshoots slightly so trimmed prompts stay inside real limits.

use crate::session::Turn;

/// Per-turn overhead for role tags and message framing.
const TURN_OVERHEAD_TOKENS: u32 = 4;

/// Estimates how many tokens a piece of text costs in a prompt.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> u32;
}

/// Character-based estimate: roughly 3.5 characters per token for English
/// prose, rounded up. Provider-neutral and cheap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> u32 {
        (text.chars().count() as f64 / 3.5).ceil() as u32
    }
}

fn turn_cost(counter: &dyn TokenCounter, turn: &Turn) -> u32 {
    TURN_OVERHEAD_TOKENS + counter.count(&turn.content)
}

/// Keep the newest suffix of `turns` whose total estimate is within
/// `max_tokens`.
///
/// An empty transcript stays empty. If even the newest turn alone exceeds
/// the budget, that single turn is kept so the conversation never loses its
/// most recent context entirely. Idempotent: trimming an already-trimmed
/// transcript returns it unchanged.
pub fn trim_history(turns: &[Turn], max_tokens: u32, counter: &dyn TokenCounter) -> Vec<Turn> {
    if turns.is_empty() {
        return Vec::new();
    }

    let mut total: u64 = 0;
    let mut start = turns.len();

    for (idx, turn) in turns.iter().enumerate().rev() {
        let cost = u64::from(turn_cost(counter, turn));
        if total + cost > u64::from(max_tokens) {
            break;
        }
        total += cost;
        start = idx;
    }

    if start == turns.len() {
        // Newest turn alone is over budget.
        return vec![turns[turns.len() - 1].clone()];
    }

    turns[start..].to_vec()
}
