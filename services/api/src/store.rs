//! Session Store
//!
//! Keeps live practice sessions in memory, keyed by id. Each session sits behind
//! its own mutex so that a slow generation call only blocks requests for that
//! one session.
//!
//! Sessions untouched for longer than the store's TTL are evicted: lazily when
//! they are looked up or a new session is inserted, and by [`SessionStore::purge_expired`]
//! which the service runs on an interval. A session locked by an in-flight
//! request is never evicted.

use chrono::{DateTime, Utc};
use goftogu_core::session::PracticeSession;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// A session plus the bookkeeping the API reports alongside it.
#[derive(Debug)]
pub struct StoredSession {
    pub id: Uuid,
    pub session: PracticeSession,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredSession {
    fn new(session: PracticeSession) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records that the session changed.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.updated_at)
            .to_std()
            .is_ok_and(|idle| idle > ttl)
    }
}

pub type SessionHandle = Arc<Mutex<StoredSession>>;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// True when the session is idle past `ttl` and no request holds it.
fn evictable(handle: &SessionHandle, ttl: Duration, now: DateTime<Utc>) -> bool {
    handle
        .try_lock()
        .is_ok_and(|stored| stored.is_expired(ttl, now))
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores a new session and returns its handle, evicting expired sessions
    /// on the way.
    pub async fn insert(&self, session: PracticeSession) -> SessionHandle {
        let stored = StoredSession::new(session);
        let id = stored.id;
        let handle = Arc::new(Mutex::new(stored));

        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        sessions.retain(|_, existing| !evictable(existing, self.ttl, now));
        sessions.insert(id, handle.clone());
        debug!(session_id = %id, live = sessions.len(), "Session stored");
        handle
    }

    /// Looks up a live session. An expired one is evicted and reported missing.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let handle = self.sessions.read().await.get(&id).cloned()?;
        if evictable(&handle, self.ttl, Utc::now()) {
            self.remove(id).await;
            debug!(session_id = %id, "Expired session evicted on lookup");
            return None;
        }
        Some(handle)
    }

    pub async fn remove(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&id)
    }

    /// Evicts every expired session that is not in use. Returns how many went.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Utc::now();
        sessions.retain(|_, handle| !evictable(handle, self.ttl, now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
