//! Session store abstraction.
//!
//! Sessions are looked up by an opaque id carried in the `sid` cookie. The store is
//! owned by the application state and handed to handlers; expiry comes from an
//! injected [`SessionPolicy`].

use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(12 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    /// May write transactions
    pub elevated: bool,
    pub expires_at: Instant,
}

impl Session {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub trait SessionStore: Send + Sync {
    fn create(&self, elevated: bool) -> Session;

    /// Live session for `id`; expired sessions are dropped and reported as absent
    fn get(&self, id: &str) -> Option<Session>;

    fn remove(&self, id: &str) -> bool;

    /// Drop every expired session, returning how many went
    fn purge_expired(&self) -> usize;
}

pub struct InMemorySessionStore {
    policy: SessionPolicy,
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, elevated: bool) -> Session {
        let session = Session {
            id: uuid::Uuid::new_v4().simple().to_string(),
            elevated,
            expires_at: Instant::now() + self.policy.ttl,
        };
        self.sessions().insert(session.id.clone(), session.clone());
        debug!("Created session (elevated: {})", elevated);
        session
    }

    fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions();
        let session = sessions.get(id)?.clone();
        if session.is_expired(Instant::now()) {
            sessions.remove(id);
            debug!("Session expired and was dropped");
            return None;
        }
        Some(session)
    }

    fn remove(&self, id: &str) -> bool {
        self.sessions().remove(id).is_some()
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_remove() {
        let store = InMemorySessionStore::new(SessionPolicy::default());

        let session = store.create(true);
        let found = store.get(&session.id).unwrap();
        assert!(found.elevated);

        assert!(store.remove(&session.id));
        assert!(store.get(&session.id).is_none());
        assert!(!store.remove(&session.id));
    }

    #[test]
    fn test_expired_sessions_are_not_returned() {
        let store = InMemorySessionStore::new(SessionPolicy { ttl: Duration::ZERO });

        let session = store.create(true);

        assert!(store.get(&session.id).is_none());
    }

    #[test]
    fn test_purge_expired() {
        let expired = InMemorySessionStore::new(SessionPolicy { ttl: Duration::ZERO });
        expired.create(false);
        expired.create(true);
        assert_eq!(expired.purge_expired(), 2);

        let live = InMemorySessionStore::new(SessionPolicy::default());
        live.create(false);
        assert_eq!(live.purge_expired(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = InMemorySessionStore::new(SessionPolicy::default());
        assert_ne!(store.create(false).id, store.create(false).id);
    }
}
