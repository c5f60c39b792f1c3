//! Session-scoped chat history with inactivity eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Who said a [`ChatTurn`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered turns of one conversation, oldest first.
pub type ChatHistory = Vec<ChatTurn>;

/// Fresh random session id.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

struct Session {
    turns: VecDeque<ChatTurn>,
    last_active: Instant,
}

/// In-memory conversations keyed by session id.
pub struct SessionStore {
    ttl: Duration,
    max_turns: usize,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_turns: usize) -> Self {
        Self {
            ttl,
            max_turns,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// History of `id`; empty for unknown or expired sessions.
    /// Reading counts as activity.
    pub async fn history(&self, id: &str) -> ChatHistory {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(id) {
            Some(s) if now.duration_since(s.last_active) < self.ttl => {
                s.last_active = now;
                s.turns.iter().cloned().collect()
            }
            Some(_) => {
                sessions.remove(id);
                trace!(session = %id, "expired session dropped on read");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Records one completed exchange, creating the session if needed.
    pub async fn append(&self, id: &str, user: &str, assistant: &str) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let s = sessions.entry(id.to_string()).or_insert_with(|| Session {
            turns: VecDeque::new(),
            last_active: now,
        });
        if now.duration_since(s.last_active) >= self.ttl {
            s.turns.clear();
        }
        s.turns.push_back(ChatTurn::user(user));
        s.turns.push_back(ChatTurn::assistant(assistant));
        // drop whole exchanges so history always opens with a user turn
        while s.turns.len() > self.max_turns {
            s.turns.pop_front();
            s.turns.pop_front();
        }
        s.last_active = now;
        trace!(session = %id, turns = s.turns.len(), "session appended");
    }

    /// Forgets `id`. Returns `true` if it existed.
    pub async fn reset(&self, id: &str) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    /// Drops every session idle for at least the TTL; returns how many.
    pub async fn evict_expired(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| now.saturating_duration_since(s.last_active) < self.ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "sessions evicted");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Runs [`SessionStore::evict_expired`] every `period` until aborted.
    pub fn spawn_evictor(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                self.evict_expired(Instant::now()).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60), 4)
    }

    #[tokio::test]
    async fn unknown_session_has_empty_history() {
        assert!(store().history("nope").await.is_empty());
    }

    #[tokio::test]
    async fn exchanges_accumulate_in_order() {
        let s = store();
        s.append("a", "q1", "a1").await;
        s.append("a", "q2", "a2").await;
        let h = s.history("a").await;
        assert_eq!(
            h,
            vec![
                ChatTurn::user("q1"),
                ChatTurn::assistant("a1"),
                ChatTurn::user("q2"),
                ChatTurn::assistant("a2"),
            ]
        );
        assert!(s.history("b").await.is_empty());
    }

    #[tokio::test]
    async fn history_is_capped_to_the_latest_turns() {
        let s = store();
        for i in 0..5 {
            s.append("a", &format!("q{i}"), &format!("a{i}")).await;
        }
        let h = s.history("a").await;
        assert_eq!(h.len(), 4);
        assert_eq!(h[0], ChatTurn::user("q3"));
        assert_eq!(h[3], ChatTurn::assistant("a4"));
    }

    #[tokio::test]
    async fn odd_cap_keeps_whole_exchanges() {
        let s = SessionStore::new(Duration::from_secs(60), 3);
        for i in 0..3 {
            s.append("a", &format!("q{i}"), &format!("a{i}")).await;
        }
        let h = s.history("a").await;
        assert_eq!(h, vec![ChatTurn::user("q2"), ChatTurn::assistant("a2")]);
    }

    #[tokio::test]
    async fn reset_forgets_the_session() {
        let s = store();
        s.append("a", "q", "a").await;
        assert!(s.reset("a").await);
        assert!(!s.reset("a").await);
        assert!(s.history("a").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire() {
        let s = store();
        s.append("old", "q", "a").await;
        tokio::time::advance(Duration::from_secs(45)).await;
        s.append("fresh", "q", "a").await;
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(s.evict_expired(Instant::now()).await, 1);
        assert_eq!(s.len().await, 1);
        assert_eq!(s.history("fresh").await.len(), 2);
        assert!(s.history("old").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reading_keeps_a_session_alive() {
        let s = store();
        s.append("a", "q", "a").await;
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(s.history("a").await.len(), 2);
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(s.history("a").await.len(), 2);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(s.history("a").await.is_empty());
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }
}
