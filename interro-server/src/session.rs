//! Per-session conversational state.
//!
//! Each `session_id` owns its own history, turn selector and random
//! source. The store is bounded: idle sessions expire after a TTL and the
//! least recently used one is evicted when the store is full. A session
//! whose handle is still held by a request is never evicted or swept; if
//! every session is busy the store grows past its bound until one frees.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use interro_core::config::{DialogueConfig, SessionConfig, TransitionPolicy};
use interro_core::history::ConversationHistory;
use interro_core::turn::TurnSelector;

/// Everything one interrogation remembers between requests.
#[derive(Debug)]
pub struct SessionState {
    /// Append-only turns of this session.
    pub history: ConversationHistory,
    /// Holds `last_speaker`.
    pub selector: TurnSelector,
    /// Source for turn and tactic draws.
    pub rng: StdRng,
}

impl SessionState {
    /// Fresh state with an explicit random source.
    #[must_use]
    pub fn new(policy: TransitionPolicy, rng: StdRng) -> Self {
        Self {
            history: ConversationHistory::new(),
            selector: TurnSelector::new(policy),
            rng,
        }
    }

    /// Fresh state seeded deterministically.
    #[must_use]
    pub fn seeded(policy: TransitionPolicy, seed: u64) -> Self {
        Self::new(policy, StdRng::seed_from_u64(seed))
    }
}

/// Handle to one session, locked for the duration of a request.
pub type SharedSession = Arc<tokio::sync::Mutex<SessionState>>;

struct Entry {
    state: SharedSession,
    last_active: Instant,
}

impl Entry {
    /// Whether a request still holds this session's handle.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.state) > 1
    }
}

/// Bounded map from `session_id` to [`SessionState`].
pub struct SessionStore {
    sessions: Mutex<LruCache<String, Entry>>,
    max_sessions: usize,
    idle_ttl: Duration,
    policy: TransitionPolicy,
    seed: Option<u64>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .field("idle_ttl", &self.idle_ttl)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store.
    ///
    /// With `seed` set, every new session starts from the same seeded
    /// generator, so identical inputs replay identically.
    #[must_use]
    pub fn new(
        max_sessions: usize,
        idle_ttl: Duration,
        policy: TransitionPolicy,
        seed: Option<u64>,
    ) -> Self {
        Self {
            sessions: Mutex::new(LruCache::unbounded()),
            max_sessions: max_sessions.max(1),
            idle_ttl,
            policy,
            seed,
        }
    }

    /// Create a store from configuration.
    #[must_use]
    pub fn from_config(sessions: &SessionConfig, dialogue: &DialogueConfig) -> Self {
        Self::new(
            sessions.max_sessions,
            Duration::from_secs(sessions.idle_ttl_secs),
            dialogue.policy,
            dialogue.seed,
        )
    }

    fn fresh_state(&self) -> SessionState {
        match self.seed {
            Some(seed) => SessionState::seeded(self.policy, seed),
            None => SessionState::new(self.policy, StdRng::from_entropy()),
        }
    }

    /// The session for `id`, created on first use.
    pub fn get_or_create(&self, id: &str) -> SharedSession {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();

        if let Some(entry) = sessions.get_mut(id) {
            if entry.in_use() || now.duration_since(entry.last_active) <= self.idle_ttl {
                entry.last_active = now;
                return entry.state.clone();
            }
            debug!(session = id, "Session expired; starting over");
            sessions.pop(id);
        }

        Self::evict_idle(&mut sessions, self.max_sessions - 1);

        let state = Arc::new(tokio::sync::Mutex::new(self.fresh_state()));
        sessions.push(
            id.to_string(),
            Entry {
                state: state.clone(),
                last_active: now,
            },
        );
        info!(session = id, active = sessions.len(), "Session created");
        state
    }

    /// Evict least recently used idle sessions until at most `keep` remain
    /// or only busy ones are left.
    fn evict_idle(sessions: &mut LruCache<String, Entry>, keep: usize) {
        while sessions.len() > keep {
            let victim = sessions
                .iter()
                .rev()
                .find(|(_, e)| !e.in_use())
                .map(|(id, _)| id.clone());
            let Some(victim) = victim else {
                debug!(active = sessions.len(), "All sessions busy; store over capacity");
                return;
            };
            sessions.pop(&victim);
            info!(session = %victim, "Evicted least recently used session");
        }
    }

    /// The session for `id`, if it exists and has not expired.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<SharedSession> {
        let sessions = self.sessions.lock();
        sessions
            .peek(id)
            .filter(|e| e.last_active.elapsed() <= self.idle_ttl)
            .map(|e| e.state.clone())
    }

    /// Drop every session idle for longer than the TTL and not held by a
    /// request. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, e)| !e.in_use() && e.last_active.elapsed() > self.idle_ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.pop(id);
        }
        if !expired.is_empty() {
            info!(removed = expired.len(), active = sessions.len(), "Swept idle sessions");
        }
        expired.len()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no session exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max: usize, ttl: Duration) -> SessionStore {
        SessionStore::new(max, ttl, TransitionPolicy::default(), Some(7))
    }

    #[tokio::test]
    async fn same_id_same_state() {
        let store = store(4, Duration::from_secs(60));
        let a = store.get_or_create("a");
        a.lock().await.history.push_user("hello");
        let again = store.get_or_create("a");
        assert_eq!(again.lock().await.history.len(), 1);
        assert!(Arc::ptr_eq(&a, &again));
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = store(4, Duration::from_secs(60));
        store.get_or_create("a").lock().await.history.push_user("mine");
        assert!(store.get_or_create("b").lock().await.history.is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn lru_bound_evicts_oldest() {
        let store = store(2, Duration::from_secs(60));
        store.get_or_create("a");
        store.get_or_create("b");
        store.get_or_create("a");
        store.get_or_create("c");
        assert_eq!(store.len(), 2);
        assert!(store.get("a").is_some());
        assert!(store.get("b").is_none());
        assert!(store.get("c").is_some());
    }

    #[tokio::test]
    async fn busy_session_is_not_evicted() {
        let store = store(1, Duration::from_secs(60));
        let a = store.get_or_create("a");
        a.lock().await.history.push_user("still talking");

        let b = store.get_or_create("b");
        assert_eq!(store.len(), 2);
        let again = store.get("a").expect("held session kept");
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(again.lock().await.history.len(), 1);

        drop((a, again, b));
        store.get_or_create("c");
        assert_eq!(store.len(), 1);
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_none());
    }

    #[test]
    fn sweep_skips_busy_sessions() {
        let store = store(8, Duration::ZERO);
        let held = store.get_or_create("a");
        store.get_or_create("b");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.sweep_expired(), 1);
        assert_eq!(store.len(), 1);
        drop(held);
        assert_eq!(store.sweep_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn idle_sessions_expire() {
        let store = store(8, Duration::ZERO);
        store.get_or_create("a");
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.get("a").is_none());
        assert_eq!(store.sweep_expired(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn expired_session_restarts_fresh() {
        let store = store(8, Duration::ZERO);
        store.get_or_create("a").lock().await.history.push_user("old");
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.get_or_create("a").lock().await.history.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_session_is_none() {
        assert!(store(2, Duration::from_secs(60)).get("nobody").is_none());
    }
}
