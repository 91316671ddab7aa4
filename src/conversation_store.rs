//! ConversationStore (C11, §4.11) — append-only per-session turn log with
//! bounded eviction. Owns every `ConversationState`; callers only ever see
//! an immutable snapshot (§3 Ownership, §9's cycle note: the Planner never
//! holds a back-reference into the store).

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::{ConversationState, ConversationTurn, Role};
use crate::error::{EngineError, EngineResult};

struct SessionEntry {
    turns: VecDeque<ConversationTurn>,
    last_touched: chrono::DateTime<Utc>,
}

struct Inner {
    sessions: HashMap<String, SessionEntry>,
    /// Recency order, most-recently-touched last, for O(1)-amortized LRU
    /// eviction without scanning every session's timestamp.
    recency: VecDeque<String>,
}

pub struct ConversationStore {
    inner: Mutex<Inner>,
    /// One async lock per session, held for the duration of an entire
    /// `chat` turn (user append → retrieval → assistant append) so two
    /// concurrent callers on the *same* session can never interleave
    /// their turns (§5: "an assistant turn for turn N always follows its
    /// user turn N and precedes any user turn N+1, even under concurrent
    /// callers"). Locking individual `append` calls is not enough — the
    /// gap between a request's user-append and its assistant-append is
    /// exactly where a second request could otherwise insert its own user
    /// turn ahead of the first request's reply.
    turn_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    max_turns: usize,
    max_sessions: usize,
}

impl ConversationStore {
    pub fn new(max_turns: usize, max_sessions: usize) -> EngineResult<Self> {
        if max_turns < 1 {
            return Err(EngineError::InvalidConfig("conversation.max_turns must be >= 1".into()));
        }
        if max_sessions < 1 {
            return Err(EngineError::InvalidConfig("conversation.max_sessions must be >= 1".into()));
        }
        Ok(Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                recency: VecDeque::new(),
            }),
            turn_locks: Mutex::new(HashMap::new()),
            max_turns,
            max_sessions,
        })
    }

    /// Returns the async lock guarding an entire turn for this session,
    /// creating it if this is the first time the session has been locked.
    /// Callers (the Planner) acquire this once per `chat` call and hold it
    /// across the whole user-append/retrieval/assistant-append sequence.
    pub fn turn_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.turn_locks
            .lock()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Returns `(session_id, snapshot)`. A `None` or unknown `session_id`
    /// creates a fresh session (the session-ownership rule, §4.10, is
    /// enforced by the Planner calling `has_session` first; this method
    /// itself just creates-if-absent).
    pub fn get_or_create(&self, session_id: Option<&str>) -> (String, ConversationState) {
        let mut inner = self.inner.lock();

        let id = match session_id {
            Some(id) if inner.sessions.contains_key(id) => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        if !inner.sessions.contains_key(&id) {
            if let Some(evicted) = Self::insert_new_session(&mut inner, id.clone(), self.max_sessions) {
                self.turn_locks.lock().remove(&evicted);
            }
        }
        Self::touch(&mut inner, &id);

        let snapshot = Self::snapshot(&inner, &id);
        (id, snapshot)
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.inner.lock().sessions.contains_key(session_id)
    }

    pub fn list_session_ids(&self) -> Vec<String> {
        self.inner.lock().sessions.keys().cloned().collect()
    }

    /// Atomic append: one turn appended and the session bumped to
    /// most-recently-touched in a single lock hold, preserving the
    /// append-ordering guarantee under concurrent callers (§5).
    pub fn append(&self, session_id: &str, role: Role, content: impl Into<String>) -> ConversationState {
        let mut inner = self.inner.lock();

        if !inner.sessions.contains_key(session_id) {
            if let Some(evicted) = Self::insert_new_session(&mut inner, session_id.to_string(), self.max_sessions) {
                self.turn_locks.lock().remove(&evicted);
            }
        }

        if let Some(entry) = inner.sessions.get_mut(session_id) {
            entry.turns.push_back(ConversationTurn {
                role,
                content: content.into(),
                timestamp: Utc::now(),
            });
            while entry.turns.len() > self.max_turns {
                entry.turns.pop_front();
            }
        }

        Self::touch(&mut inner, session_id);
        Self::snapshot(&inner, session_id)
    }

    /// Inserts a fresh session, evicting the least-recently-touched one
    /// first if at capacity. Returns the evicted session id, if any, so
    /// the caller can also drop its now-orphaned turn lock.
    fn insert_new_session(inner: &mut Inner, id: String, max_sessions: usize) -> Option<String> {
        let evicted = if inner.sessions.len() >= max_sessions {
            inner.recency.pop_front().inspect(|oldest| {
                inner.sessions.remove(oldest);
            })
        } else {
            None
        };
        inner.sessions.insert(
            id,
            SessionEntry {
                turns: VecDeque::new(),
                last_touched: Utc::now(),
            },
        );
        evicted
    }

    fn touch(inner: &mut Inner, id: &str) {
        inner.recency.retain(|s| s != id);
        inner.recency.push_back(id.to_string());
        if let Some(entry) = inner.sessions.get_mut(id) {
            entry.last_touched = Utc::now();
        }
    }

    fn snapshot(inner: &Inner, id: &str) -> ConversationState {
        let turns = inner
            .sessions
            .get(id)
            .map(|entry| entry.turns.iter().cloned().collect())
            .unwrap_or_default();
        ConversationState {
            session_id: id.to_string(),
            turns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_id_yields_a_fresh_one() {
        let store = ConversationStore::new(50, 10).unwrap();
        let (id, snapshot) = store.get_or_create(Some("not-a-real-session"));
        assert_ne!(id, "not-a-real-session");
        assert!(snapshot.turns.is_empty());
    }

    #[test]
    fn append_ordering_within_a_session() {
        let store = ConversationStore::new(50, 10).unwrap();
        let (id, _) = store.get_or_create(None);
        store.append(&id, Role::User, "hello");
        let snapshot = store.append(&id, Role::Assistant, "hi there");
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[0].role, Role::User);
        assert_eq!(snapshot.turns[1].role, Role::Assistant);
    }

    #[test]
    fn eviction_keeps_exactly_max_turns_most_recent() {
        let store = ConversationStore::new(5, 10).unwrap();
        let (id, _) = store.get_or_create(None);
        let mut last = store.append(&id, Role::User, "turn-0");
        for i in 1..10 {
            last = store.append(&id, Role::User, format!("turn-{i}"));
        }
        assert_eq!(last.turns.len(), 5);
        assert_eq!(last.turns[0].content, "turn-5");
        assert_eq!(last.turns[4].content, "turn-9");
    }

    #[test]
    fn session_eviction_is_least_recently_touched() {
        let store = ConversationStore::new(50, 2).unwrap();
        let (a, _) = store.get_or_create(None);
        let (b, _) = store.get_or_create(None);
        // touch `a` again so `b` becomes the least-recently-touched
        store.append(&a, Role::User, "keep me alive");
        let (c, _) = store.get_or_create(None);

        assert!(store.has_session(&a));
        assert!(store.has_session(&c));
        assert!(!store.has_session(&b));
    }

    #[test]
    fn construction_rejects_invalid_bounds() {
        assert!(ConversationStore::new(0, 10).is_err());
        assert!(ConversationStore::new(10, 0).is_err());
    }
}
