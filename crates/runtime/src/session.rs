//! Bounded, expiring store of per-session conversation histories.

use crate::llm::Message;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Shared handle to one session's history.
///
/// Holding the lock for a whole turn serializes turns on the same session.
pub type SessionHandle = Arc<tokio::sync::Mutex<Vec<Message>>>;

/// Capacity and expiry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum number of live sessions. Values below 1 are treated as 1.
    pub max_sessions: usize,
    /// Inactivity after which a session expires.
    pub session_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            session_timeout: Duration::from_secs(3600),
        }
    }
}

struct Session {
    history: SessionHandle,
    created_at: Instant,
    last_access: Instant,
}

/// Maps session ids to histories, bounded by capacity and inactivity.
///
/// Lookup, purge, eviction, and the access-time update run under a single
/// lock, so concurrent callers never observe a half-applied sequence.
pub struct SessionStore {
    config: SessionConfig,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: SessionConfig {
                max_sessions: config.max_sessions.max(1),
                ..config
            },
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Return the history for `id`, creating it if needed.
    ///
    /// Expired sessions are purged first. If `id` is new and the store is
    /// full, the least recently accessed session is evicted.
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        let mut sessions = self.lock();
        // Read the clock only once the lock is held, so access times follow
        // lock order.
        let now = Instant::now();
        self.purge_expired(&mut sessions, now);

        if !sessions.contains_key(id) && sessions.len() >= self.config.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_access)
                .map(|(key, _)| key.clone());
            if let Some((key, session)) = oldest.and_then(|key| sessions.remove_entry(&key)) {
                info!(
                    session = %key,
                    age_secs = now.saturating_duration_since(session.created_at).as_secs(),
                    "evicting least recently used session"
                );
            }
        }

        let session = sessions.entry(id.to_string()).or_insert_with(|| {
            debug!(session = %id, "creating session");
            Session {
                history: SessionHandle::default(),
                created_at: now,
                last_access: now,
            }
        });
        session.last_access = now;
        session.history.clone()
    }

    /// Number of live sessions, after purging expired ones.
    ///
    /// Informational only.
    pub fn count(&self) -> usize {
        let mut sessions = self.lock();
        self.purge_expired(&mut sessions, Instant::now());
        sessions.len()
    }

    /// Whether `id` is live, without touching its access time.
    pub fn contains(&self, id: &str) -> bool {
        let mut sessions = self.lock();
        self.purge_expired(&mut sessions, Instant::now());
        sessions.contains_key(id)
    }

    /// Drop every session.
    pub fn clear_all(&self) {
        let mut sessions = self.lock();
        debug!(count = sessions.len(), "clearing all sessions");
        sessions.clear();
    }

    fn purge_expired(&self, sessions: &mut HashMap<String, Session>, now: Instant) {
        let timeout = self.config.session_timeout;
        let before = sessions.len();
        sessions.retain(|_, s| now.saturating_duration_since(s.last_access) <= timeout);
        let purged = before - sessions.len();
        if purged > 0 {
            debug!(purged, "purged expired sessions");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
