//! In-memory session transcripts.
//!
//! Each session id maps to an ordered transcript of user/assistant turns.
//! Transcripts only ever grow by whole exchanges; per-request token
//! budgeting works on a snapshot and never rewrites stored history.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single message in a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Process-local store of session transcripts.
///
/// Sessions are created lazily on first reference. All methods take `&self`;
/// interior locking keeps an exchange append atomic, so readers never observe
/// a user turn without its answer.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the transcript for `session_id`, creating an empty session
    /// if it does not exist yet.
    pub fn get_or_create(&self, session_id: &str) -> Vec<Turn> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.entry(session_id.to_string()).or_default().clone()
    }

    /// Append a completed exchange: the user question followed by the
    /// assistant answer, under a single write lock.
    pub fn append_exchange(&self, session_id: &str, question: &str, answer: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let transcript = sessions.entry(session_id.to_string()).or_default();
        transcript.push(Turn::user(question));
        transcript.push(Turn::assistant(answer));
    }

    /// Drop the transcript for `session_id`. Clearing an unknown session is
    /// a no-op; the next reference starts from an empty transcript.
    pub fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let store = SessionStore::new();
        assert!(store.get_or_create("s1").is_empty());
    }

    #[test]
    fn test_exchanges_preserve_order() {
        let store = SessionStore::new();
        store.append_exchange("s1", "first question", "first answer");
        store.append_exchange("s1", "second question", "second answer");

        let transcript = store.get_or_create("s1");
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[0].role, TurnRole::User);
        assert_eq!(transcript[0].content, "first question");
        assert_eq!(transcript[1].role, TurnRole::Assistant);
        assert_eq!(transcript[1].content, "first answer");
        assert_eq!(transcript[2].content, "second question");
        assert_eq!(transcript[3].content, "second answer");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.append_exchange("s1", "q", "a");

        assert_eq!(store.get_or_create("s1").len(), 2);
        assert!(store.get_or_create("s2").is_empty());
    }

    #[test]
    fn test_clear_resets_transcript() {
        let store = SessionStore::new();
        store.append_exchange("s1", "q", "a");
        store.clear("s1");
        assert!(store.get_or_create("s1").is_empty());
    }

    #[test]
    fn test_clear_unknown_session_is_noop() {
        let store = SessionStore::new();
        store.clear("never-seen");
        assert!(store.get_or_create("never-seen").is_empty());
    }
}
