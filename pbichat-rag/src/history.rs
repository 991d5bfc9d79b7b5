//! In-memory session history store
//!
//! Maps opaque session ids to ordered turn sequences. Lifetime is the
//! process lifetime; there is no persistence. The store is the only shared
//! mutable state in the service: individual operations are atomic through
//! the lock, but two concurrent pipelines on the same session id may
//! interleave their appends (accepted limitation for a one-client-per-
//! session usage model).

use crate::types::Turn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Shared store of per-session conversation turns
#[derive(Clone, Default)]
pub struct SessionHistoryStore {
    sessions: Arc<RwLock<HashMap<String, Vec<Turn>>>>,
}

impl SessionHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a snapshot of the session's turns, creating the session if
    /// it does not exist yet. Never fails.
    pub async fn get_or_create(&self, session_id: &str) -> Vec<Turn> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_default().clone()
    }

    /// Append a turn to the end of the session's sequence
    pub async fn append(&self, session_id: &str, turn: Turn) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_default().push(turn);
    }

    /// Remove the session entirely; clearing an absent session is a no-op
    pub async fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(session_id).is_some() {
            debug!("Cleared history for session: {}", session_id);
        }
    }

    /// Keep only the most recent `max_len` turns, preserving order
    pub async fn trim(&self, session_id: &str, max_len: usize) {
        let mut sessions = self.sessions.write().await;
        if let Some(turns) = sessions.get_mut(session_id) {
            if turns.len() > max_len {
                let excess = turns.len() - max_len;
                turns.drain(..excess);
                debug!(
                    "Trimmed {} oldest turns from session: {}",
                    excess, session_id
                );
            }
        }
    }

    /// Number of turns currently stored for a session
    pub async fn len(&self, session_id: &str) -> usize {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(Vec::len).unwrap_or(0)
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_session_yields_empty_sequence() {
        let store = SessionHistoryStore::new();
        let turns = store.get_or_create("fresh").await;
        assert!(turns.is_empty());
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn append_preserves_insertion_order() {
        let store = SessionHistoryStore::new();
        store.append("s1", Turn::user("What is DAX?")).await;
        store.append("s1", Turn::model("A formula language.")).await;

        let turns = store.get_or_create("s1").await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "What is DAX?");
        assert_eq!(turns[1].content, "A formula language.");
    }

    #[tokio::test]
    async fn trim_keeps_most_recent_turns() {
        let store = SessionHistoryStore::new();
        for i in 0..10 {
            store.append("s1", Turn::user(format!("q{}", i))).await;
        }

        store.trim("s1", 4).await;

        let turns = store.get_or_create("s1").await;
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "q6");
        assert_eq!(turns[3].content, "q9");
    }

    #[tokio::test]
    async fn trim_below_bound_is_a_noop() {
        let store = SessionHistoryStore::new();
        store.append("s1", Turn::user("hello")).await;
        store.trim("s1", 20).await;
        assert_eq!(store.len("s1").await, 1);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = SessionHistoryStore::new();
        store.clear("never-seen").await;

        store.append("s1", Turn::user("hello")).await;
        store.clear("s1").await;
        store.clear("s1").await;
        assert_eq!(store.len("s1").await, 0);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionHistoryStore::new();
        store.append("a", Turn::user("question a")).await;
        store.append("b", Turn::user("question b")).await;

        store.clear("a").await;
        assert_eq!(store.len("a").await, 0);
        assert_eq!(store.len("b").await, 1);
    }
}
